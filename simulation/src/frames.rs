//! Per-step frame export
//!
//! A [`StepFrame`] is the read-only picture of one step handed to rendering
//! tools: nodes (with positions on geospatial topologies), edges and the
//! copies in flight. Rendering and animation happen outside this crate.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use churn_core::{MessageId, NetworkView, NodeId, Position, SimError, SimResult, TopologyKind};
use churn_routing::MessageCopy;

use crate::topology::Snapshot;

/// Node as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// In-flight copy as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCopy {
    pub message: MessageId,
    pub holder: NodeId,
    /// Remaining hops, `None` when unlimited
    pub budget: Option<u32>,
}

/// Snapshot of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFrame {
    pub step: u64,
    pub nodes: Vec<FrameNode>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub copies: Vec<FrameCopy>,
}

impl StepFrame {
    pub fn capture<'a>(
        step: u64,
        snapshot: &Snapshot,
        copies: impl IntoIterator<Item = &'a MessageCopy>,
    ) -> Self {
        let nodes = NodeId::range(snapshot.node_count())
            .map(|id| FrameNode {
                id,
                position: snapshot.position(id),
            })
            .collect();
        let copies = copies
            .into_iter()
            .map(|copy| FrameCopy {
                message: copy.message,
                holder: copy.holder,
                budget: copy.budget.remaining(),
            })
            .collect();
        Self {
            step,
            nodes,
            edges: snapshot.edges(),
            copies,
        }
    }
}

/// Receiver of one frame per step
pub trait FrameSink {
    fn record(&mut self, frame: &StepFrame) -> SimResult<()>;
}

/// Keeps every frame in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSink {
    pub frames: Vec<StepFrame>,
}

impl MemoryFrameSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemoryFrameSink {
    fn record(&mut self, frame: &StepFrame) -> SimResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Directory and file stem shared by every frame of a run
pub fn frame_prefix(topology: TopologyKind, num_nodes: usize, density: f64, volatility: f64) -> String {
    format!("{}-n{}-d{}-v{}", topology, num_nodes, density, volatility)
}

/// Writes each frame as `{dir}/{prefix}/{prefix}-{step:05}.json`
#[derive(Debug)]
pub struct JsonFrameWriter {
    dir: PathBuf,
    prefix: String,
    written: usize,
}

impl JsonFrameWriter {
    /// Create the writer, creating `{base}/{prefix}` if needed
    pub fn new(base: impl AsRef<Path>, prefix: impl Into<String>) -> SimResult<Self> {
        let prefix = prefix.into();
        let dir = base.as_ref().join(&prefix);
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Writing frames");
        Ok(Self {
            dir,
            prefix,
            written: 0,
        })
    }

    /// File a frame for `step` is written to
    pub fn path_for(&self, step: u64) -> PathBuf {
        self.dir.join(format!("{}-{:05}.json", self.prefix, step))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for JsonFrameWriter {
    fn record(&mut self, frame: &StepFrame) -> SimResult<()> {
        let mut writer = BufWriter::new(File::create(self.path_for(frame.step))?);
        serde_json::to_writer(&mut writer, frame)
            .map_err(|e| SimError::FrameEncode(e.to_string()))?;
        writer.flush()?;
        self.written += 1;
        Ok(())
    }
}
