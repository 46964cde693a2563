//! Single-entry graphics pipeline cache keyed on the host's render pass.
//!
//! The triangle pipeline must be compatible with whatever render pass the host
//! is recording into, so it is rebuilt whenever that render pass changes. A
//! replaced pipeline may still be referenced by the command buffer of the
//! frame being recorded; it is retired with that frame's number and destroyed
//! once the host reports the frame as complete, or at shutdown.

use ash::vk;
use tracing::{debug, info, warn};

use rplug_core::transform::TRANSFORM_SIZE;
use rplug_core::{PluginError, SkipReason};

use crate::device::DeviceApi;
use crate::host::RecordingState;
use crate::shaders;
use crate::vertex;

/// Pipeline and layout to bind for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineHandles {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

#[derive(Debug)]
struct RetiredPipeline {
    pipeline: vk::Pipeline,
    last_frame: u64,
}

#[derive(Debug)]
pub struct PipelineCache {
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    render_pass: vk::RenderPass,
    retired: Vec<RetiredPipeline>,
    builds: u64,
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineCache {
    pub fn new() -> Self {
        Self {
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            render_pass: vk::RenderPass::null(),
            retired: Vec::new(),
            builds: 0,
        }
    }

    /// Render pass the cached pipeline was built against.
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn current(&self) -> Option<PipelineHandles> {
        if self.pipeline == vk::Pipeline::null() || self.layout == vk::PipelineLayout::null() {
            return None;
        }
        Some(PipelineHandles {
            pipeline: self.pipeline,
            layout: self.layout,
        })
    }

    /// Number of pipelines successfully built over the cache's lifetime.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Replaced pipelines still waiting for the GPU to finish with them.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Return a pipeline usable inside `recording.render_pass`, building one if
    /// the render pass changed since the last call.
    ///
    /// A failed build leaves the previous entry in place and is retried on the
    /// next call, since the cached render pass still differs.
    pub fn ensure<D: DeviceApi + ?Sized>(
        &mut self,
        device: &D,
        recording: &RecordingState,
        pipeline_cache: vk::PipelineCache,
    ) -> Result<PipelineHandles, PluginError> {
        self.collect_retired(device, recording.safe_frame);

        let render_pass = recording.render_pass;
        if render_pass == vk::RenderPass::null() {
            return Err(PluginError::PreconditionSkip(SkipReason::NoRenderPass));
        }
        if recording.subpass_index != 0 {
            debug!(
                "drawing in subpass {} with a pipeline built for subpass 0",
                recording.subpass_index
            );
        }

        if render_pass == self.render_pass {
            if let Some(handles) = self.current() {
                return Ok(handles);
            }
        }

        if self.layout == vk::PipelineLayout::null() {
            self.layout = create_triangle_layout(device)?;
        }
        let pipeline = build_triangle_pipeline(device, self.layout, render_pass, pipeline_cache)?;

        if self.pipeline != vk::Pipeline::null() {
            self.retired.push(RetiredPipeline {
                pipeline: self.pipeline,
                last_frame: recording.current_frame,
            });
        }
        self.pipeline = pipeline;
        self.render_pass = render_pass;
        self.builds += 1;
        info!(
            "built triangle pipeline for render pass {:?} (build #{})",
            render_pass, self.builds
        );

        Ok(PipelineHandles {
            pipeline,
            layout: self.layout,
        })
    }

    /// Destroy every pipeline, retired or current, and the layout.
    pub fn destroy<D: DeviceApi + ?Sized>(&mut self, device: &D) {
        for retired in self.retired.drain(..) {
            device.destroy_pipeline(retired.pipeline);
        }
        if self.pipeline != vk::Pipeline::null() {
            device.destroy_pipeline(self.pipeline);
            self.pipeline = vk::Pipeline::null();
        }
        if self.layout != vk::PipelineLayout::null() {
            device.destroy_pipeline_layout(self.layout);
            self.layout = vk::PipelineLayout::null();
        }
        self.render_pass = vk::RenderPass::null();
    }

    fn collect_retired<D: DeviceApi + ?Sized>(&mut self, device: &D, safe_frame: u64) {
        self.retired.retain(|retired| {
            if retired.last_frame <= safe_frame {
                debug!("destroying retired pipeline {:?}", retired.pipeline);
                device.destroy_pipeline(retired.pipeline);
                false
            } else {
                true
            }
        });
    }
}

/// Shader module that lives only for the duration of one pipeline build.
struct TransientModule<'a, D: DeviceApi + ?Sized> {
    device: &'a D,
    module: vk::ShaderModule,
}

impl<'a, D: DeviceApi + ?Sized> TransientModule<'a, D> {
    fn create(device: &'a D, code: &[u32], stage: &'static str) -> Result<Self, PluginError> {
        match device.create_shader_module(code) {
            Ok(module) => Ok(Self { device, module }),
            Err(e) => {
                warn!("{} shader module failed: {:?}", stage, e);
                Err(PluginError::CompilationFailure {
                    stage,
                    code: e.as_raw(),
                })
            }
        }
    }
}

impl<D: DeviceApi + ?Sized> Drop for TransientModule<'_, D> {
    fn drop(&mut self) {
        self.device.destroy_shader_module(self.module);
    }
}

/// Layout with a single vertex-stage push-constant range holding the transform.
fn create_triangle_layout<D: DeviceApi + ?Sized>(
    device: &D,
) -> Result<vk::PipelineLayout, PluginError> {
    let push_constant_range = vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: TRANSFORM_SIZE,
    };
    let create_info = vk::PipelineLayoutCreateInfo::default()
        .push_constant_ranges(std::slice::from_ref(&push_constant_range));

    device.create_pipeline_layout(&create_info).map_err(|e| {
        warn!("pipeline layout creation failed: {:?}", e);
        PluginError::PipelineBuildFailure { code: e.as_raw() }
    })
}

fn build_triangle_pipeline<D: DeviceApi + ?Sized>(
    device: &D,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    pipeline_cache: vk::PipelineCache,
) -> Result<vk::Pipeline, PluginError> {
    let vertex_module = TransientModule::create(device, shaders::VERTEX_SPIRV, "vertex")?;
    let fragment_module = TransientModule::create(device, shaders::FRAGMENT_SPIRV, "fragment")?;

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module.module)
            .name(shaders::ENTRY_POINT),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module.module)
            .name(shaders::ENTRY_POINT),
    ];

    let bindings = [vertex::binding_description()];
    let attributes = vertex::attribute_descriptions();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

    // Viewport and scissor come from the host at record time.
    let viewport = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .depth_bias_enable(false)
        .line_width(1.0);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    // Reversed depth: 1.0 is the near plane.
    let stencil_op = vk::StencilOpState {
        fail_op: vk::StencilOp::KEEP,
        pass_op: vk::StencilOp::KEEP,
        compare_op: vk::CompareOp::ALWAYS,
        ..Default::default()
    };
    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::GREATER_OR_EQUAL)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
        .front(stencil_op)
        .back(stencil_op);

    let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false);
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .attachments(std::slice::from_ref(&blend_attachment));

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    // Both modules are released when they drop, whatever the outcome here.
    device
        .create_graphics_pipeline(pipeline_cache, &create_info)
        .map_err(|e| {
            warn!("graphics pipeline creation failed: {:?}", e);
            PluginError::PipelineBuildFailure { code: e.as_raw() }
        })
}
