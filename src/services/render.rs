//! Render capability boundary.
//!
//! A renderer accepts a declarative [`ChartSpec`] and hands back an owned
//! [`RenderHandle`]. Whoever holds the handle releases it before asking for
//! the next render of the same chart.

use crate::error::{AppError, Result};
use crate::types::ChartSpec;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::debug;

/// Owned handle to one live render instance.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "render handles must be released through the renderer"]
pub struct RenderHandle {
    id: u64,
}

impl RenderHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Something that turns a chart spec into a visible chart.
pub trait ChartRenderer {
    /// Create a render instance for `spec`.
    fn render(&mut self, spec: ChartSpec) -> Result<RenderHandle>;

    /// Tear down a render instance and return its resources.
    fn release(&mut self, handle: RenderHandle);
}

/// Renderer that exports each spec as JSON, for external charting engines.
pub struct JsonSpecRenderer<W: Write> {
    writer: W,
    next_id: u64,
    live: BTreeSet<u64>,
}

impl<W: Write> JsonSpecRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_id: 1,
            live: BTreeSet::new(),
        }
    }

    /// Number of instances rendered and not yet released.
    pub fn live_instances(&self) -> usize {
        self.live.len()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChartRenderer for JsonSpecRenderer<W> {
    fn render(&mut self, spec: ChartSpec) -> Result<RenderHandle> {
        serde_json::to_writer_pretty(&mut self.writer, &spec)?;
        writeln!(self.writer).map_err(|e| AppError::Render(e.to_string()))?;

        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        debug!("Exported chart spec #{} ({} series)", id, spec.series.len());
        Ok(RenderHandle::new(id))
    }

    fn release(&mut self, handle: RenderHandle) {
        self.live.remove(&handle.id());
    }
}
