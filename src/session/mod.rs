// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The diagram session controller.
//!
//! [`DiagramSessionController`] owns everything a session edits: the canonical source (text
//! mode) or graph (graph mode), undo history, layout versions, the pending plan and the chat
//! log. Every user action enters here, is routed to the pure engines in [`crate::ops`],
//! [`crate::history`] and [`crate::workflow`] or to the generation service, and ends with a
//! re-render plus a list of [`SessionEvent`]s for the host UI.
//!
//! Requests to the generation service are split into prepare, dispatch and apply steps so a host
//! can keep several in flight; whichever resolves last wins. The `submit_prompt`,
//! `confirm_plan`, `retry_last` and `edit_turn` helpers run all three steps in sequence.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::error::{NetworkError, SessionError, StateError, Surface, ValidationError};
use crate::format::mermaid::{export_flowchart, parse_flowchart};
use crate::history::{HistoryManager, HistorySnapshot, HISTORY_LIMIT};
use crate::model::{
    ConversationLog, ConversationTurn, DiagramKind, DiagramSource, DiagramVersion, EdgeId,
    EditorMode, GraphEdge, GraphNode, GraphState, IdAllocator, NodeId, NodeShape, Point, Role,
    UserId, VersionSet,
};
use crate::ops::{
    apply_entity_edit, apply_graph_ops, declared_labels, EntityEdit, GraphDelta, GraphOp,
    GraphOpError, LabelPolicy, NodePatch,
};
use crate::render::{
    ClickEvent, HandlerScope, NodeClick, RenderPipeline, RenderedDiagram, SvgInteractionMapper,
};
use crate::service::{
    self, DetailLevel, DiagramOutcome, GenerateFromPlanRequest, GenerateRequest,
    GenerationRequest, GenerationService, ServiceReply, UpdateRequest,
};
use crate::store::{chat_key, sidebar_key, KeyValueStore, KeyValueStoreExt};
use crate::workflow::{PendingPlan, PlanWorkflow};

pub mod live;
pub mod selection;

pub use live::LiveSync;
pub use selection::EntitySelection;

/// Session behaviour taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub label_policy: LabelPolicy,
    pub plan_first: bool,
    pub model: Option<String>,
    pub detail_level: DetailLevel,
    pub history_limit: usize,
    pub auto_sync: bool,
    pub debounce: std::time::Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            label_policy: LabelPolicy::default(),
            plan_first: false,
            model: None,
            detail_level: DetailLevel::default(),
            history_limit: HISTORY_LIMIT,
            auto_sync: true,
            debounce: live::DEFAULT_DEBOUNCE,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            label_policy: config.editor.label_policy(),
            plan_first: config.editor.plan_first,
            model: config.service.model.clone(),
            detail_level: config.service.detail_level,
            history_limit: config.editor.history_limit,
            auto_sync: config.editor.auto_sync,
            debounce: config.editor.debounce(),
        }
    }
}

/// Notifications for the host UI, drained with [`DiagramSessionController::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RenderInstalled { render_id: u64, node_count: usize },
    /// The new source did not render; the previous drawing stays on screen.
    RenderFailed { message: String },
    InlineError { node_id: Option<String>, message: String },
    Toast { message: String, retry: bool },
    PlanReady { summary: String },
    ConversationChanged,
    ModeChanged(EditorMode),
    SelectionChanged { node_ids: Vec<String> },
}

/// A saved diagram handed back by the host's persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagramSnapshot {
    pub code: String,
    pub diagram_kind: DiagramKind,
    pub versions: Vec<DiagramVersion>,
    pub explanation: Option<String>,
}

/// A request ready to be sent; see [`dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub seq: u64,
    pub request: GenerationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub seq: u64,
    pub request: GenerationRequest,
    pub reply: Result<ServiceReply, NetworkError>,
}

/// Send a prepared request. Holds no borrow of the controller, so several can run at once.
pub async fn dispatch(client: &dyn GenerationService, prepared: PreparedRequest) -> ResolvedRequest {
    let reply = service::dispatch(client, &prepared.request).await;
    ResolvedRequest { seq: prepared.seq, request: prepared.request, reply }
}

#[derive(Debug, Clone)]
struct Drag {
    node_id: NodeId,
}

pub struct DiagramSessionController {
    options: SessionOptions,
    service: Arc<dyn GenerationService>,
    store: Arc<dyn KeyValueStore>,

    mode: EditorMode,
    source: Option<DiagramSource>,
    graph: GraphState,
    ids: IdAllocator,
    history: HistoryManager,
    versions: VersionSet,
    workflow: PlanWorkflow,
    log: ConversationLog,
    explanation: Option<String>,
    diagram_kind: DiagramKind,

    renderer: RenderPipeline,
    mapper: SvgInteractionMapper,
    handlers: Option<HandlerScope>,
    clicks_tx: mpsc::UnboundedSender<NodeClick>,
    clicks_rx: mpsc::UnboundedReceiver<NodeClick>,
    selection: EntitySelection,
    live: LiveSync,
    drag: Option<Drag>,

    identity: Option<UserId>,
    sidebar_visible: bool,
    last_request: Option<GenerationRequest>,
    next_seq: u64,
    events: Vec<SessionEvent>,
}

impl std::fmt::Debug for DiagramSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramSessionController")
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("versions", &self.versions.len())
            .field("workflow", &self.workflow.state().name())
            .field("turns", &self.log.len())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl DiagramSessionController {
    pub fn new(
        options: SessionOptions,
        service: Arc<dyn GenerationService>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (clicks_tx, clicks_rx) = mpsc::unbounded_channel();
        Self {
            history: HistoryManager::new(options.history_limit),
            live: LiveSync::new(options.debounce, options.auto_sync),
            options,
            service,
            store,
            mode: EditorMode::Text,
            source: None,
            graph: GraphState::default(),
            ids: IdAllocator::default(),
            versions: VersionSet::default(),
            workflow: PlanWorkflow::new(),
            log: ConversationLog::default(),
            explanation: None,
            diagram_kind: DiagramKind::default(),
            renderer: RenderPipeline::default(),
            mapper: SvgInteractionMapper::new(),
            handlers: None,
            clicks_tx,
            clicks_rx,
            selection: EntitySelection::default(),
            drag: None,
            identity: None,
            sidebar_visible: true,
            last_request: None,
            next_seq: 0,
            events: Vec::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: RenderPipeline) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn service(&self) -> Arc<dyn GenerationService> {
        Arc::clone(&self.service)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn source(&self) -> Option<&DiagramSource> {
        self.source.as_ref()
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn workflow(&self) -> &PlanWorkflow {
        &self.workflow
    }

    pub fn pending_plan(&self) -> Option<&PendingPlan> {
        self.workflow.pending_plan()
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.log
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn diagram_kind(&self) -> DiagramKind {
        self.diagram_kind
    }

    pub fn set_diagram_kind(&mut self, kind: DiagramKind) {
        self.diagram_kind = kind;
    }

    pub fn rendered(&self) -> Option<&RenderedDiagram> {
        self.renderer.last_good()
    }

    pub fn selection(&self) -> &EntitySelection {
        &self.selection
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn last_request(&self) -> Option<&GenerationRequest> {
        self.last_request.as_ref()
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// DOM ids of the shapes drawn for `node_id` in the current render.
    pub fn highlight_ids(&self, node_id: &str) -> Vec<String> {
        self.handlers.as_ref().map(|scope| scope.highlight_ids(node_id)).unwrap_or_default()
    }

    fn report(&mut self, err: SessionError, node_id: Option<&str>) -> SessionError {
        let event = match err.surface() {
            Surface::Inline => SessionEvent::InlineError {
                node_id: node_id.map(str::to_owned),
                message: err.to_string(),
            },
            Surface::ToastWithRetry => SessionEvent::Toast {
                message: match &err {
                    SessionError::Network(network) => network.user_message(),
                    other => other.to_string(),
                },
                retry: true,
            },
            Surface::Toast => SessionEvent::Toast { message: err.to_string(), retry: false },
        };
        self.events.push(event);
        err
    }

    fn require_mode(&self, expected: EditorMode) -> Result<(), SessionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(StateError::WrongMode { expected }.into())
        }
    }

    /// Render `source` and make it canonical. On failure the previous source stays installed.
    fn install_source(&mut self, source: DiagramSource) -> Result<(), SessionError> {
        let rendered = match self.renderer.render(&source) {
            Ok(rendered) => rendered.clone(),
            Err(err) => {
                self.events.push(SessionEvent::RenderFailed { message: err.to_string() });
                return Err(err.into());
            }
        };
        self.source = Some(source);
        self.attach_handlers(&rendered);
        Ok(())
    }

    /// Re-render the graph in graph mode. The graph itself is already committed.
    fn render_graph(&mut self) -> Result<(), SessionError> {
        let text = export_flowchart(&self.graph)?;
        let rendered = match self.renderer.render(&DiagramSource::new(text)) {
            Ok(rendered) => rendered.clone(),
            Err(err) => {
                self.events.push(SessionEvent::RenderFailed { message: err.to_string() });
                return Err(err.into());
            }
        };
        self.attach_handlers(&rendered);
        Ok(())
    }

    fn attach_handlers(&mut self, rendered: &RenderedDiagram) {
        if let Some(mut previous) = self.handlers.take() {
            previous.detach();
        }
        let sender = self.clicks_tx.clone();
        let scope = self.mapper.attach(
            &rendered.svg,
            &rendered.node_ids,
            Box::new(move |click: &NodeClick| {
                let _ = sender.send(click.clone());
            }),
        );
        self.handlers = Some(scope);
        self.events.push(SessionEvent::RenderInstalled {
            render_id: rendered.render_id,
            node_count: rendered.node_ids.len(),
        });
    }

    fn detach_handlers(&mut self) {
        if let Some(mut scope) = self.handlers.take() {
            scope.detach();
        }
    }

    fn persist_log(&mut self) {
        let Some(user) = &self.identity else {
            return;
        };
        let key = chat_key(user.as_str());
        if let Err(err) = self.store.save(&key, self.log.persisted_tail()) {
            tracing::warn!(%key, error = %err, "failed to persist conversation");
            self.events.push(SessionEvent::Toast { message: err.to_string(), retry: false });
        }
    }

    fn append_turn(&mut self, role: Role, text: impl Into<String>, kind: Option<DiagramKind>) {
        self.log.append(role, text, kind);
        self.events.push(SessionEvent::ConversationChanged);
        self.persist_log();
    }

    /// Switch to `user`. The previous identity's conversation is dropped, in memory and in the
    /// store; its sidebar flag is kept. The new identity's persisted log and sidebar flag are
    /// loaded.
    pub fn set_identity(&mut self, user: &str) -> Result<(), SessionError> {
        let user_id = UserId::new(user.trim())
            .map_err(|_| ValidationError::InvalidId { value: user.to_owned() })?;
        if self.identity.as_ref() == Some(&user_id) {
            return Ok(());
        }
        tracing::info!(user = %user_id, "switching identity");
        if let Some(previous) = &self.identity {
            if let Err(err) = self.store.remove(&chat_key(previous.as_str())) {
                tracing::warn!(user = %previous, error = %err, "could not clear previous conversation");
            }
        }
        self.log.clear();

        let turns = match self.store.load::<Vec<ConversationTurn>>(&chat_key(user_id.as_str())) {
            Ok(turns) => turns.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(user = %user_id, error = %err, "discarding unreadable conversation");
                Vec::new()
            }
        };
        self.log = ConversationLog::from_turns(turns);
        self.sidebar_visible = self
            .store
            .load::<bool>(&sidebar_key(user_id.as_str()))
            .ok()
            .flatten()
            .unwrap_or(true);
        self.identity = Some(user_id);
        self.events.push(SessionEvent::ConversationChanged);
        Ok(())
    }

    pub fn set_sidebar_visible(&mut self, visible: bool) -> Result<(), SessionError> {
        self.sidebar_visible = visible;
        if let Some(user) = &self.identity {
            self.store.save(&sidebar_key(user.as_str()), &visible)?;
        }
        Ok(())
    }

    /// Start over. The persisted conversation of the current identity is left alone.
    pub fn new_diagram(&mut self) {
        tracing::info!("new diagram");
        self.detach_handlers();
        self.renderer.clear();
        self.mode = EditorMode::Text;
        self.source = None;
        self.graph = GraphState::default();
        self.ids = IdAllocator::default();
        self.history.clear();
        self.versions.clear();
        self.workflow.reset();
        self.explanation = None;
        self.selection.clear();
        self.live.discard();
        self.drag = None;
        self.last_request = None;
        self.events.push(SessionEvent::ModeChanged(EditorMode::Text));
    }

    pub fn load_diagram(&mut self, snapshot: DiagramSnapshot) -> Result<(), SessionError> {
        self.new_diagram();
        self.diagram_kind = snapshot.diagram_kind;
        self.explanation = snapshot.explanation;
        let versions = if snapshot.versions.is_empty() {
            vec![DiagramVersion::new(snapshot.code)]
        } else {
            snapshot.versions
        };
        self.versions.replace(versions);
        let code = self.versions.active().map(|version| version.code.clone()).unwrap_or_default();
        self.install_source(DiagramSource::new(code))
            .map_err(|err| self.report(err, None))
    }

    /// Switch to layout version `index`. Out-of-range indices are ignored (`Ok(false)`); a
    /// version that fails to render is not selected.
    pub fn select_version(&mut self, index: usize) -> Result<bool, SessionError> {
        self.require_mode(EditorMode::Text)?;
        let previous = self.versions.selected_index();
        if !self.versions.select(index) {
            return Ok(false);
        }
        let code = self.versions.active().map(|version| version.code.clone()).unwrap_or_default();
        if let Err(err) = self.install_source(DiagramSource::new(code)) {
            self.versions.select(previous);
            return Err(self.report(err, None));
        }
        self.selection.clear();
        Ok(true)
    }

    /// Install a generated diagram. The selected version is rendered first; when that fails the
    /// previous versions, source and render all stay as they were.
    fn install_outcome(&mut self, outcome: DiagramOutcome, kind: Option<DiagramKind>) -> Result<(), SessionError> {
        let count = outcome.versions.len();
        let code = outcome
            .versions
            .get(outcome.selected)
            .map(|version| version.code.clone())
            .unwrap_or_default();
        self.install_source(DiagramSource::new(code))?;

        self.versions.replace(outcome.versions);
        self.versions.select(outcome.selected);
        self.explanation = outcome.explanation.clone();
        if let Some(kind) = kind {
            self.diagram_kind = kind;
        }
        if self.mode == EditorMode::Graph {
            self.mode = EditorMode::Text;
            self.history.clear();
            self.events.push(SessionEvent::ModeChanged(EditorMode::Text));
        }
        self.selection.clear();

        let message = outcome
            .explanation
            .unwrap_or_else(|| format!("Diagram ready ({count} layout version(s))"));
        self.append_turn(Role::Assistant, message, kind);
        Ok(())
    }

    fn prepare(&mut self, request: GenerationRequest) -> PreparedRequest {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.last_request = Some(request.clone());
        tracing::debug!(seq, request = request.name(), "request prepared");
        PreparedRequest { seq, request }
    }

    fn validate_prompt(text: &str) -> Result<String, SessionError> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt.into());
        }
        Ok(prompt.to_owned())
    }

    fn route_prompt(&mut self, prompt: String) -> GenerationRequest {
        if self.workflow.pending_plan().is_some() {
            tracing::info!("new prompt discards the pending plan");
            self.workflow.reset();
        }
        if let Some(source) = &self.source {
            return GenerationRequest::Update(UpdateRequest {
                prompt,
                current_mermaid: source.as_str().to_owned(),
                model: self.options.model.clone(),
            });
        }
        let body = GenerateRequest {
            prompt: prompt.clone(),
            diagram_type: self.diagram_kind,
            model: self.options.model.clone(),
            code_detail_level: self.options.detail_level,
        };
        if self.options.plan_first {
            self.workflow.begin_planning(prompt, self.diagram_kind);
            GenerationRequest::Plan(body)
        } else {
            GenerationRequest::Generate(body)
        }
    }

    /// Validate and record a user prompt, and build the request for it.
    ///
    /// Blank prompts are rejected without touching any state. With a diagram installed the
    /// prompt becomes an update of the current source; otherwise a fresh generation (or a plan,
    /// when plan-first is enabled).
    pub fn prepare_prompt(&mut self, text: &str) -> Result<PreparedRequest, SessionError> {
        let prompt = Self::validate_prompt(text).map_err(|err| self.report(err, None))?;
        self.append_turn(Role::User, prompt.clone(), Some(self.diagram_kind));
        let request = self.route_prompt(prompt);
        Ok(self.prepare(request))
    }

    /// Move the pending plan to `Generating` and build the generate-from-plan request.
    pub fn prepare_confirm_plan(&mut self) -> Result<PreparedRequest, SessionError> {
        let plan = self.workflow.confirm().map_err(|err| self.report(err.into(), None))?;
        let request = GenerationRequest::FromPlan(GenerateFromPlanRequest {
            diagram_plan: plan.raw,
            diagram_type: plan.diagram_kind,
            code_detail_level: self.options.detail_level,
        });
        Ok(self.prepare(request))
    }

    /// Rebuild the last request verbatim, restoring the workflow state it expects.
    pub fn prepare_retry(&mut self) -> Result<PreparedRequest, SessionError> {
        let request = self
            .last_request
            .clone()
            .ok_or(StateError::NothingToRetry)
            .map_err(|err| self.report(err.into(), None))?;
        match &request {
            GenerationRequest::Plan(body) => {
                self.workflow.begin_planning(body.prompt.clone(), body.diagram_type);
            }
            GenerationRequest::FromPlan(_) => {
                // Idle means the plan already went through; anything else must be confirmable.
                if !self.workflow.is_idle() {
                    self.workflow.confirm().map_err(|err| self.report(err.into(), None))?;
                }
            }
            GenerationRequest::Generate(_) | GenerationRequest::Update(_) => {}
        }
        tracing::info!(request = request.name(), "retrying last request");
        Ok(self.prepare(request))
    }

    /// Edit a past user turn, drop everything after it and build the regeneration request.
    ///
    /// Editing the first user turn regenerates from scratch; later turns update the current
    /// source.
    pub fn prepare_edit_turn(&mut self, turn_id: &str, text: &str) -> Result<PreparedRequest, SessionError> {
        let prompt = Self::validate_prompt(text).map_err(|err| self.report(err, None))?;
        let first = self.log.is_first_user_turn(turn_id);
        let removed = self
            .log
            .edit_user_turn(turn_id, prompt.clone())
            .map_err(|err| self.report(err.into(), None))?;
        tracing::info!(turn_id, removed, first, "conversation turn edited");
        self.events.push(SessionEvent::ConversationChanged);
        self.persist_log();

        let request = match (&self.source, first) {
            (Some(source), false) => GenerationRequest::Update(UpdateRequest {
                prompt,
                current_mermaid: source.as_str().to_owned(),
                model: self.options.model.clone(),
            }),
            _ => GenerationRequest::Generate(GenerateRequest {
                prompt,
                diagram_type: self.diagram_kind,
                model: self.options.model.clone(),
                code_detail_level: self.options.detail_level,
            }),
        };
        Ok(self.prepare(request))
    }

    /// Fold a resolved request into the session.
    pub fn apply(&mut self, resolved: ResolvedRequest) -> Result<(), SessionError> {
        let ResolvedRequest { seq, request, reply } = resolved;
        tracing::debug!(seq, request = request.name(), ok = reply.is_ok(), "applying response");

        match (reply, &request) {
            (Err(err), GenerationRequest::Plan(_)) => {
                self.workflow.plan_failed();
                Err(self.report(err.into(), None))
            }
            (Err(err), GenerationRequest::FromPlan(_)) => {
                self.workflow.generation_failed();
                Err(self.report(err.into(), None))
            }
            (Err(err), _) => Err(self.report(err.into(), None)),
            (Ok(ServiceReply::Plan(plan)), GenerationRequest::Plan(body)) => {
                let pending = PendingPlan::new(
                    plan.diagram_plan,
                    body.diagram_type,
                    body.prompt.clone(),
                    plan.plan_summary.as_deref(),
                )
                .map_err(|err| {
                    self.workflow.plan_failed();
                    self.report(err.into(), None)
                })?;
                let summary = pending.summary.clone();
                if !self.workflow.plan_ready(pending) {
                    return Ok(());
                }
                self.append_turn(Role::Assistant, summary.clone(), Some(body.diagram_type));
                self.events.push(SessionEvent::PlanReady { summary });
                Ok(())
            }
            (Ok(ServiceReply::Plan(_)), _) => {
                let err = NetworkError::InvalidResponseShape {
                    reason: format!("{} request answered with a plan", request.name()),
                };
                Err(self.report(err.into(), None))
            }
            (Ok(ServiceReply::Diagram(outcome)), _) => {
                if matches!(request, GenerationRequest::FromPlan(_)) {
                    self.workflow.generation_finished();
                }
                self.install_outcome(outcome, request.diagram_kind())
                    .map_err(|err| self.report(err, None))
            }
        }
    }

    pub async fn submit_prompt(&mut self, text: &str) -> Result<(), SessionError> {
        let prepared = self.prepare_prompt(text)?;
        let resolved = dispatch(self.service.as_ref(), prepared).await;
        self.apply(resolved)
    }

    pub async fn confirm_plan(&mut self) -> Result<(), SessionError> {
        let prepared = self.prepare_confirm_plan()?;
        let resolved = dispatch(self.service.as_ref(), prepared).await;
        self.apply(resolved)
    }

    /// Discard the pending plan. No request is sent.
    pub fn cancel_plan(&mut self) -> Result<(), SessionError> {
        self.workflow.cancel().map_err(|err| self.report(err.into(), None))
    }

    pub async fn retry_last(&mut self) -> Result<(), SessionError> {
        let prepared = self.prepare_retry()?;
        let resolved = dispatch(self.service.as_ref(), prepared).await;
        self.apply(resolved)
    }

    pub async fn edit_turn(&mut self, turn_id: &str, text: &str) -> Result<(), SessionError> {
        let prepared = self.prepare_edit_turn(turn_id, text)?;
        let resolved = dispatch(self.service.as_ref(), prepared).await;
        self.apply(resolved)
    }

    /// Apply an attribute edit to one node.
    ///
    /// Text mode rewrites only that node's label/style rule in the source. Graph mode patches the
    /// node and records an undo step.
    pub fn update_entity(&mut self, node_id: &str, edit: &EntityEdit) -> Result<(), SessionError> {
        let result = match self.mode {
            EditorMode::Text => self.update_entity_text(node_id, edit),
            EditorMode::Graph => self.update_entity_graph(node_id, edit),
        };
        result.map_err(|err| self.report(err, Some(node_id)))
    }

    fn update_entity_text(&mut self, node_id: &str, edit: &EntityEdit) -> Result<(), SessionError> {
        let source = self.source.as_ref().ok_or(StateError::NoDiagram)?;
        let updated = apply_entity_edit(source, node_id, edit, &self.options.label_policy)?;
        if &updated == source {
            return Ok(());
        }
        self.install_source(updated.clone())?;
        self.versions.set_active_code(updated.into_string());
        Ok(())
    }

    fn update_entity_graph(&mut self, node_id: &str, edit: &EntityEdit) -> Result<(), SessionError> {
        let node_id = self.graph_node_id(node_id)?;
        let label = edit
            .label
            .as_deref()
            .map(|label| self.options.label_policy.display_label(label))
            .transpose()?;
        if let Some(style) = &edit.style {
            style.validate()?;
        }
        let patch = NodePatch { label, shape: None, style: edit.style.clone().map(Some) };
        self.edit_graph(&[GraphOp::UpdateNode { node_id, patch }])?;
        Ok(())
    }

    /// Record hand-typed source. It is installed once the editor has been quiet for the debounce
    /// period (see [`Self::poll_live_sync`]) or on [`Self::sync_now`].
    pub fn edit_source(&mut self, text: impl Into<String>) {
        self.live.edit(text, tokio::time::Instant::now());
    }

    pub fn set_auto_sync(&mut self, enabled: bool) {
        self.live.set_enabled(enabled);
    }

    /// Install the pending hand edit if it is due. Returns whether anything was installed.
    pub fn poll_live_sync(&mut self) -> Result<bool, SessionError> {
        match self.live.poll(tokio::time::Instant::now()) {
            Some(text) => self.install_hand_edit(text).map(|()| true),
            None => Ok(false),
        }
    }

    /// Wait for the debounce period and install the pending hand edit.
    pub async fn await_live_sync(&mut self) -> Result<bool, SessionError> {
        match self.live.ready().await {
            Some(text) => self.install_hand_edit(text).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn sync_now(&mut self) -> Result<bool, SessionError> {
        match self.live.flush() {
            Some(text) => self.install_hand_edit(text).map(|()| true),
            None => Ok(false),
        }
    }

    fn install_hand_edit(&mut self, text: String) -> Result<(), SessionError> {
        self.require_mode(EditorMode::Text)?;
        let source = DiagramSource::new(text);
        if source.is_blank() {
            return Ok(());
        }
        self.install_source(source.clone()).map_err(|err| self.report(err, None))?;
        if self.versions.is_empty() {
            self.versions.replace(vec![DiagramVersion::new(source.into_string())]);
        } else {
            self.versions.set_active_code(source.into_string());
        }
        Ok(())
    }

    /// Deliver a DOM click on the current render. Returns whether a node was hit.
    pub fn click_shape(&mut self, dom_id: &str, event: ClickEvent) -> bool {
        let hit = self.handlers.as_mut().is_some_and(|scope| scope.click(dom_id, event));
        self.pump_clicks();
        hit
    }

    /// Apply clicks queued by the interaction handlers.
    pub fn pump_clicks(&mut self) {
        while let Ok(click) = self.clicks_rx.try_recv() {
            self.select_entity(&click);
        }
    }

    pub fn select_entity(&mut self, click: &NodeClick) {
        let current_label = match self.mode {
            EditorMode::Text => self.source.as_ref().and_then(|source| {
                declared_labels(source)
                    .into_iter()
                    .find(|(id, _)| *id == click.node_id)
                    .map(|(_, label)| label)
            }),
            EditorMode::Graph => self.graph.node(&click.node_id).map(|node| node.label.clone()),
        };
        self.selection.apply_click(click, current_label);
        self.events.push(SessionEvent::SelectionChanged {
            node_ids: self.selection.selected().map(str::to_owned).collect(),
        });
    }

    pub fn selection_mut(&mut self) -> &mut EntitySelection {
        &mut self.selection
    }

    /// Apply the pending edit: the label goes to the primary node, the style to every selected
    /// node. The selection is cleared either way.
    pub fn save_edit(&mut self) -> Result<(), SessionError> {
        let (primary, selected, edit) = self.selection.take();
        let Some(primary) = primary else {
            return Err(self.report(StateError::NothingSelected.into(), None));
        };
        if edit.is_empty() {
            return Ok(());
        }

        if let Some(label) = edit.label.clone() {
            self.update_entity(&primary, &EntityEdit::label(label))?;
        }
        if let Some(style) = edit.style {
            for node_id in &selected {
                self.update_entity(node_id, &EntityEdit::style(style.clone()))?;
            }
        }
        self.events.push(SessionEvent::SelectionChanged { node_ids: Vec::new() });
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.selection.clear();
        self.events.push(SessionEvent::SelectionChanged { node_ids: Vec::new() });
    }

    /// Parse the current source into a graph and make the graph authoritative.
    pub fn enter_graph_mode(&mut self) -> Result<(), SessionError> {
        if self.mode == EditorMode::Graph {
            return Ok(());
        }
        let source = self.source.as_ref().ok_or(StateError::NoDiagram)?;
        let graph = parse_flowchart(source.as_str()).map_err(|err| self.report(err.into(), None))?;
        self.ids = IdAllocator::default();
        self.ids.observe(
            graph.nodes().iter().map(|node| &node.id),
            graph.edges().iter().map(|edge| &edge.id),
        );
        self.graph = graph;
        self.history.clear();
        self.selection.clear();
        self.mode = EditorMode::Graph;
        self.events.push(SessionEvent::ModeChanged(EditorMode::Graph));
        tracing::info!(nodes = self.graph.nodes().len(), edges = self.graph.edges().len(), "entered graph mode");
        self.render_graph().map_err(|err| self.report(err, None))
    }

    /// Export the graph back to source and make the source authoritative.
    pub fn enter_text_mode(&mut self) -> Result<(), SessionError> {
        if self.mode == EditorMode::Text {
            return Ok(());
        }
        let text = export_flowchart(&self.graph).map_err(|err| self.report(err.into(), None))?;
        self.mode = EditorMode::Text;
        self.history.clear();
        self.drag = None;
        self.selection.clear();
        self.events.push(SessionEvent::ModeChanged(EditorMode::Text));
        self.install_source(DiagramSource::new(text.clone()))
            .map_err(|err| self.report(err, None))?;
        self.versions.set_active_code(text);
        Ok(())
    }

    fn graph_node_id(&self, node_id: &str) -> Result<NodeId, SessionError> {
        let id = NodeId::new(node_id)
            .map_err(|_| ValidationError::InvalidId { value: node_id.to_owned() })?;
        if !self.graph.contains_node(node_id) {
            return Err(GraphOpError::NodeNotFound { node_id: id }.into());
        }
        Ok(id)
    }

    /// Apply `ops` atomically and record the prior state as one undo step.
    fn edit_graph(&mut self, ops: &[GraphOp]) -> Result<GraphDelta, SessionError> {
        self.require_mode(EditorMode::Graph)?;
        let before = HistorySnapshot::capture(&self.graph);
        let delta = apply_graph_ops(&mut self.graph, ops)?;
        self.commit_graph(before)?;
        Ok(delta)
    }

    /// Record `before` in history (unless suppressed) and re-render.
    fn commit_graph(&mut self, before: HistorySnapshot) -> Result<(), SessionError> {
        self.history.push(before);
        self.render_graph()
    }

    /// Delete nodes and their edges as a single undo step.
    pub fn delete_nodes(&mut self, node_ids: &[&str]) -> Result<GraphDelta, SessionError> {
        let ops = node_ids
            .iter()
            .map(|node_id| self.graph_node_id(node_id).map(|node_id| GraphOp::RemoveNode { node_id }))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.report(err, None))?;
        let delta = self.edit_graph(&ops).map_err(|err| self.report(err, None))?;
        let removed = node_ids.iter().copied().collect::<BTreeSet<_>>();
        if self.selection.selected().any(|id| removed.contains(id)) {
            self.selection.clear();
        }
        Ok(delta)
    }

    pub fn delete_edge(&mut self, edge_id: &str) -> Result<GraphDelta, SessionError> {
        let edge_id = EdgeId::new(edge_id)
            .map_err(|_| ValidationError::InvalidId { value: edge_id.to_owned() })
            .map_err(|err| self.report(err.into(), None))?;
        self.edit_graph(&[GraphOp::RemoveEdge { edge_id }])
            .map_err(|err| self.report(err, None))
    }

    /// Connect two nodes with a fresh edge.
    pub fn connect(&mut self, from: &str, to: &str, label: Option<&str>) -> Result<EdgeId, SessionError> {
        let from = self.graph_node_id(from).map_err(|err| self.report(err, None))?;
        let to = self.graph_node_id(to).map_err(|err| self.report(err, None))?;
        let label = label
            .map(|label| self.options.label_policy.display_label(label))
            .transpose()
            .map_err(|err| self.report(err.into(), None))?;
        let edge_id = self.ids.next_edge_id();
        let edge = GraphEdge::new(edge_id.clone(), from, to).with_label(label);
        self.edit_graph(&[GraphOp::AddEdge { edge }])
            .map_err(|err| self.report(err, None))?;
        Ok(edge_id)
    }

    pub fn add_node(&mut self, label: &str, shape: NodeShape, position: Point) -> Result<NodeId, SessionError> {
        let label = self
            .options
            .label_policy
            .display_label(label)
            .map_err(|err| self.report(err.into(), None))?;
        let node_id = self.ids.next_node_id();
        let node = GraphNode::new(node_id.clone(), label).with_shape(shape).with_position(position);
        self.edit_graph(&[GraphOp::AddNode { node }])
            .map_err(|err| self.report(err, None))?;
        Ok(node_id)
    }

    /// Start dragging `node_id`. The pre-drag state becomes one undo step.
    pub fn begin_drag(&mut self, node_id: &str) -> Result<(), SessionError> {
        self.require_mode(EditorMode::Graph)?;
        let node_id = self.graph_node_id(node_id).map_err(|err| self.report(err, None))?;
        self.history.push(HistorySnapshot::capture(&self.graph));
        self.drag = Some(Drag { node_id });
        Ok(())
    }

    /// Move the dragged node. Intermediate positions are not recorded.
    pub fn drag_to(&mut self, position: Point) -> Result<(), SessionError> {
        let Some(drag) = &self.drag else {
            return Ok(());
        };
        let op = GraphOp::MoveNode { node_id: drag.node_id.clone(), position };
        apply_graph_ops(&mut self.graph, &[op])?;
        Ok(())
    }

    pub fn end_drag(&mut self) -> Result<(), SessionError> {
        if self.drag.take().is_some() {
            self.render_graph()?;
        }
        Ok(())
    }

    /// Step back one graph edit. A no-op (returning `false`) when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        if self.mode != EditorMode::Graph {
            return Ok(false);
        }
        let current = HistorySnapshot::capture(&self.graph);
        let Some(previous) = self.history.undo(current.clone()) else {
            return Ok(false);
        };
        self.restore(previous, current)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, SessionError> {
        if self.mode != EditorMode::Graph {
            return Ok(false);
        }
        let current = HistorySnapshot::capture(&self.graph);
        let Some(next) = self.history.redo(current.clone()) else {
            return Ok(false);
        };
        self.restore(next, current)?;
        Ok(true)
    }

    fn restore(&mut self, snapshot: HistorySnapshot, current: HistorySnapshot) -> Result<(), SessionError> {
        self.drag = None;
        snapshot.restore_into(&mut self.graph);
        self.history.suppress_next_push();
        self.commit_graph(current)
    }
}
