use std::fmt;

use crate::events::GraphicsApi;

/// Native call that failed while building a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStage {
    CreateBuffer,
    AllocateMemory,
    MapMemory,
    BindMemory,
    FlushMemory,
}

impl fmt::Display for AllocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateBuffer => "buffer creation",
            Self::AllocateMemory => "memory allocation",
            Self::MapMemory => "memory mapping",
            Self::BindMemory => "buffer binding",
            Self::FlushMemory => "mapped range flush",
        };
        f.write_str(name)
    }
}

/// Why a draw or event was skipped. Skips are expected and never logged above trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No backend was selected for the active graphics API.
    NoBackend,
    /// The device has not seen Initialize, or has been shut down.
    DeviceNotInitialized,
    /// The host is not recording a command buffer right now.
    NotRecording,
    /// Recording state carried a null render pass.
    NoRenderPass,
    /// No vertex buffer could be allocated for this frame.
    NoVertexBuffer,
    /// Render-event id this plugin does not handle.
    UnhandledEvent(i32),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBackend => f.write_str("no active backend"),
            Self::DeviceNotInitialized => f.write_str("device not initialized"),
            Self::NotRecording => f.write_str("host is not recording"),
            Self::NoRenderPass => f.write_str("no render pass bound"),
            Self::NoVertexBuffer => f.write_str("vertex buffer unavailable"),
            Self::UnhandledEvent(id) => write!(f, "unhandled render event {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    #[error("zero-sized buffer requested")]
    ZeroSizedBuffer,

    #[error("{stage} failed: code={code}")]
    AllocationFailure { stage: AllocationStage, code: i32 },

    #[error("no host-visible memory type in mask {type_bits:#x}")]
    NoHostVisibleMemory { type_bits: u32 },

    #[error("{stage} shader module failed to build: code={code}")]
    CompilationFailure { stage: &'static str, code: i32 },

    #[error("graphics pipeline build failed: code={code}")]
    PipelineBuildFailure { code: i32 },

    #[error("unsupported graphics backend: {0}")]
    UnsupportedBackend(GraphicsApi),

    #[error("skipped: {0}")]
    PreconditionSkip(SkipReason),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PluginError {
    /// True for the silent, expected skips as opposed to real failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::PreconditionSkip(_))
    }
}
