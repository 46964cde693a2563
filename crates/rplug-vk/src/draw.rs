//! Records the triangle into the host's command buffer.

use ash::vk;

use crate::device::DeviceApi;
use crate::pipeline::PipelineHandles;
use crate::vertex::TRIANGLE;

/// Bind the vertex buffer, push the transform, bind the pipeline and draw one
/// instance of the triangle. The host must be inside a compatible render pass.
pub fn record_triangle<D: DeviceApi + ?Sized>(
    device: &D,
    cmd: vk::CommandBuffer,
    vertex_buffer: vk::Buffer,
    pipeline: PipelineHandles,
    transform: &[f32; 16],
) {
    device.cmd_bind_vertex_buffers(cmd, &[vertex_buffer], &[0]);
    device.cmd_push_constants(
        cmd,
        pipeline.layout,
        vk::ShaderStageFlags::VERTEX,
        bytemuck::cast_slice(transform.as_slice()),
    );
    device.cmd_bind_pipeline(cmd, pipeline.pipeline);
    device.cmd_draw(cmd, TRIANGLE.len() as u32, 1);
}
