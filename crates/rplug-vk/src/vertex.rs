//! Vertex format and the fixed triangle uploaded at device initialization.

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// Position plus packed RGBA8 color, 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: u32,
}

pub const VERTEX_STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

/// Colors are packed little-endian; the R8G8B8A8 attribute reads the low byte as red.
pub const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [-0.5, -0.25, 0.0],
        color: 0xFFFF0000,
    },
    Vertex {
        position: [0.5, -0.25, 0.0],
        color: 0xFF00FF00,
    },
    Vertex {
        position: [0.0, 0.5, 0.0],
        color: 0xFF0000FF,
    },
];

pub fn triangle_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&TRIANGLE)
}

pub fn binding_description() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: VERTEX_STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R8G8B8A8_UNORM,
            offset: 12,
        },
    ]
}
