//! Identifiers the host uses for its graphics API and device lifecycle.

use std::fmt;

/// Render-event id that triggers the triangle draw unless configured otherwise.
pub const DRAW_EVENT_ID: i32 = 1;

/// Graphics API the host renderer is running on.
///
/// Raw values match the host's renderer enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    Direct3D11,
    Null,
    OpenGLES3,
    Metal,
    OpenGLCore,
    Direct3D12,
    Vulkan,
    Other(i32),
}

impl GraphicsApi {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            2 => Self::Direct3D11,
            4 => Self::Null,
            11 => Self::OpenGLES3,
            16 => Self::Metal,
            17 => Self::OpenGLCore,
            18 => Self::Direct3D12,
            21 => Self::Vulkan,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::Direct3D11 => 2,
            Self::Null => 4,
            Self::OpenGLES3 => 11,
            Self::Metal => 16,
            Self::OpenGLCore => 17,
            Self::Direct3D12 => 18,
            Self::Vulkan => 21,
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct3D11 => f.write_str("Direct3D 11"),
            Self::Null => f.write_str("null device"),
            Self::OpenGLES3 => f.write_str("OpenGL ES 3"),
            Self::Metal => f.write_str("Metal"),
            Self::OpenGLCore => f.write_str("OpenGL Core"),
            Self::Direct3D12 => f.write_str("Direct3D 12"),
            Self::Vulkan => f.write_str("Vulkan"),
            Self::Other(raw) => write!(f, "renderer #{raw}"),
        }
    }
}

/// Graphics-device notification delivered by the host on its render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Initialize,
    Shutdown,
    BeforeReset,
    AfterReset,
    Other(i32),
}

impl DeviceEvent {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Initialize,
            1 => Self::Shutdown,
            2 => Self::BeforeReset,
            3 => Self::AfterReset,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::Initialize => 0,
            Self::Shutdown => 1,
            Self::BeforeReset => 2,
            Self::AfterReset => 3,
            Self::Other(raw) => raw,
        }
    }
}
