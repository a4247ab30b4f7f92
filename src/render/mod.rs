// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! DSL to SVG rendering.
//!
//! Every change is a full re-render. [`RenderPipeline`] keeps the last successful output, so a
//! broken document never blanks the diagram; the failure is reported next to it instead.

use thiserror::Error;

use crate::model::DiagramSource;

pub mod interaction;
pub mod layout;
pub mod svg;

pub use interaction::{
    node_id_from_dom_id, ClickCallback, ClickEvent, HandlerScope, NodeClick, SvgInteractionMapper,
};
pub use layout::{layout_graph, FlowLayout, LayoutOptions, NodeBox};
pub use svg::FlowchartSvgRenderer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("diagram source is empty")]
    EmptyDocument,
    #[error("'{header}' diagrams cannot be rendered here")]
    UnsupportedDiagram { header: String },
    #[error("diagram has a syntax error: {message}")]
    Syntax { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub svg: String,
    /// Increases with every render of a pipeline.
    pub render_id: u64,
    /// DSL ids of the nodes drawn, in document order.
    pub node_ids: Vec<String>,
}

pub trait Renderer: Send + Sync {
    fn render(&self, source: &DiagramSource, render_id: u64) -> Result<RenderedDiagram, RenderError>;
}

pub struct RenderPipeline {
    renderer: Box<dyn Renderer>,
    next_render_id: u64,
    last_good: Option<RenderedDiagram>,
    last_error: Option<RenderError>,
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("next_render_id", &self.next_render_id)
            .field("last_good", &self.last_good.as_ref().map(|render| render.render_id))
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Box::new(FlowchartSvgRenderer::default()))
    }
}

impl RenderPipeline {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self { renderer, next_render_id: 0, last_good: None, last_error: None }
    }

    /// Render `source`. On failure the previous render stays current.
    pub fn render(&mut self, source: &DiagramSource) -> Result<&RenderedDiagram, RenderError> {
        let render_id = self.next_render_id;
        self.next_render_id += 1;

        match self.renderer.render(source, render_id) {
            Ok(rendered) => {
                tracing::debug!(render_id, nodes = rendered.node_ids.len(), "render installed");
                self.last_error = None;
                Ok(self.last_good.insert(rendered))
            }
            Err(err) => {
                tracing::warn!(
                    render_id,
                    error = %err,
                    kept = ?self.last_good.as_ref().map(|render| render.render_id),
                    "render failed, keeping previous output"
                );
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn last_good(&self) -> Option<&RenderedDiagram> {
        self.last_good.as_ref()
    }

    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    pub fn clear(&mut self) {
        self.last_good = None;
        self.last_error = None;
    }
}
