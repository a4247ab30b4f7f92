// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The two-phase "plan, review, then generate" workflow.
//!
//! ```text
//! Idle -> Planning -> PlanReady -> (confirm) Generating -> Idle
//!                              \-> (cancel)  Idle
//! ```
//!
//! `Confirmed` and `Cancelled` are instantaneous: they are logged but never observable as a
//! resting state.

use serde_json::Value;

use crate::error::StateError;
use crate::model::DiagramKind;

pub mod plan;

pub use plan::StructuralPlan;

/// A plan waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPlan {
    pub structural_plan: StructuralPlan,
    /// The plan exactly as the service sent it; sent back verbatim on confirmation.
    pub raw: Value,
    pub diagram_kind: DiagramKind,
    pub originating_prompt: String,
    pub summary: String,
}

impl PendingPlan {
    /// `service_summary` wins when the service supplied a non-blank one.
    pub fn new(
        raw: Value,
        diagram_kind: DiagramKind,
        originating_prompt: impl Into<String>,
        service_summary: Option<&str>,
    ) -> Result<Self, crate::error::ParseError> {
        let structural_plan = StructuralPlan::from_value(diagram_kind, &raw)?;
        let summary = service_summary
            .map(str::trim)
            .filter(|summary| !summary.is_empty())
            .map_or_else(|| structural_plan.summary(), str::to_owned);
        Ok(Self {
            structural_plan,
            raw,
            diagram_kind,
            originating_prompt: originating_prompt.into(),
            summary,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlanState {
    #[default]
    Idle,
    Planning { prompt: String, kind: DiagramKind },
    PlanReady(PendingPlan),
    Generating { plan: PendingPlan },
}

impl PlanState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning { .. } => "planning",
            Self::PlanReady(_) => "plan_ready",
            Self::Generating { .. } => "generating",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanWorkflow {
    state: PlanState,
}

impl PlanWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PlanState::Idle)
    }

    pub fn pending_plan(&self) -> Option<&PendingPlan> {
        match &self.state {
            PlanState::PlanReady(plan) => Some(plan),
            _ => None,
        }
    }

    fn transition(&mut self, next: PlanState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "plan workflow transition");
        self.state = next;
    }

    /// Enter `Planning`. Any plan still waiting for confirmation is discarded.
    pub fn begin_planning(&mut self, prompt: impl Into<String>, kind: DiagramKind) {
        if let PlanState::PlanReady(previous) = &self.state {
            tracing::info!(
                prompt = %previous.originating_prompt,
                "discarding pending plan for a new prompt"
            );
        }
        self.transition(PlanState::Planning { prompt: prompt.into(), kind });
    }

    /// Store a resolved plan. Returns `false` (and drops the plan) unless a plan was requested.
    pub fn plan_ready(&mut self, plan: PendingPlan) -> bool {
        if !matches!(self.state, PlanState::Planning { .. }) {
            tracing::debug!(state = self.state.name(), "ignoring plan that nobody waits for");
            return false;
        }
        self.transition(PlanState::PlanReady(plan));
        true
    }

    pub fn plan_failed(&mut self) {
        if matches!(self.state, PlanState::Planning { .. }) {
            self.transition(PlanState::Idle);
        }
    }

    /// `PlanReady -> Generating`. Returns the plan to generate from.
    pub fn confirm(&mut self) -> Result<PendingPlan, StateError> {
        let plan = match &self.state {
            PlanState::PlanReady(plan) => plan.clone(),
            PlanState::Planning { .. } => return Err(StateError::PlanNotReady),
            _ => return Err(StateError::NoPendingPlan),
        };
        tracing::info!(kind = %plan.diagram_kind, "plan confirmed");
        self.transition(PlanState::Generating { plan: plan.clone() });
        Ok(plan)
    }

    /// `PlanReady -> Idle` without any network call.
    pub fn cancel(&mut self) -> Result<(), StateError> {
        if !matches!(self.state, PlanState::PlanReady(_)) {
            return Err(StateError::NoPendingPlan);
        }
        tracing::info!("plan cancelled");
        self.transition(PlanState::Idle);
        Ok(())
    }

    pub fn generation_finished(&mut self) {
        if matches!(self.state, PlanState::Generating { .. }) {
            self.transition(PlanState::Idle);
        }
    }

    /// A failed generation returns to `PlanReady` so the plan can be confirmed again.
    pub fn generation_failed(&mut self) {
        if let PlanState::Generating { plan } = &self.state {
            let plan = plan.clone();
            self.transition(PlanState::PlanReady(plan));
        }
    }

    pub fn reset(&mut self) {
        if !self.is_idle() {
            self.transition(PlanState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{PendingPlan, PlanState, PlanWorkflow};
    use crate::error::StateError;
    use crate::model::DiagramKind;

    fn pending(prompt: &str) -> PendingPlan {
        PendingPlan::new(
            json!({"components": [{"name": "Queue", "type": "queue"}]}),
            DiagramKind::Architecture,
            prompt,
            None,
        )
        .expect("plan")
    }

    fn ready(prompt: &str) -> PlanWorkflow {
        let mut workflow = PlanWorkflow::new();
        workflow.begin_planning(prompt, DiagramKind::Architecture);
        assert!(workflow.plan_ready(pending(prompt)));
        workflow
    }

    #[test]
    fn confirm_moves_through_generating_to_idle() {
        let mut workflow = ready("payments");
        let plan = workflow.confirm().expect("confirm");
        assert_eq!(plan.originating_prompt, "payments");
        assert!(matches!(workflow.state(), PlanState::Generating { .. }));

        workflow.generation_finished();
        assert!(workflow.is_idle());
    }

    #[test]
    fn cancel_discards_the_plan() {
        let mut workflow = ready("payments");
        workflow.cancel().expect("cancel");
        assert!(workflow.is_idle());
        assert!(workflow.pending_plan().is_none());
        assert_eq!(workflow.cancel(), Err(StateError::NoPendingPlan));
    }

    #[test]
    fn confirm_outside_plan_ready_is_rejected() {
        let mut workflow = PlanWorkflow::new();
        assert_eq!(workflow.confirm(), Err(StateError::NoPendingPlan));

        workflow.begin_planning("x", DiagramKind::Hld);
        assert_eq!(workflow.confirm(), Err(StateError::PlanNotReady));
        assert!(matches!(workflow.state(), PlanState::Planning { .. }));
    }

    #[test]
    fn new_prompt_replaces_pending_plan() {
        let mut workflow = ready("first");
        workflow.begin_planning("second", DiagramKind::Architecture);
        assert!(workflow.pending_plan().is_none());
        assert!(workflow.plan_ready(pending("second")));
        assert_eq!(
            workflow.pending_plan().map(|plan| plan.originating_prompt.as_str()),
            Some("second")
        );
    }

    #[test]
    fn failures_fall_back_to_the_previous_resting_state() {
        let mut workflow = PlanWorkflow::new();
        workflow.begin_planning("x", DiagramKind::Architecture);
        workflow.plan_failed();
        assert!(workflow.is_idle());

        let mut workflow = ready("y");
        workflow.confirm().expect("confirm");
        workflow.generation_failed();
        assert!(workflow.pending_plan().is_some());
    }

    #[test]
    fn late_plans_are_ignored() {
        let mut workflow = PlanWorkflow::new();
        assert!(!workflow.plan_ready(pending("late")));
        assert!(workflow.is_idle());
    }

    #[test]
    fn service_summary_wins_over_local_one() {
        let plan = PendingPlan::new(json!({}), DiagramKind::Class, "p", Some("  From service "))
            .expect("plan");
        assert_eq!(plan.summary, "From service");
        let plan = PendingPlan::new(json!({}), DiagramKind::Class, "p", Some(" ")).expect("plan");
        assert_eq!(plan.summary, "Diagram plan ready");
    }
}
