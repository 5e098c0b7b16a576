//! WGSL shader compilation: assembled program source to wgpu::ComputePipeline

use super::device_init::WgpuContext;
use crate::codegen::AssembledKernel;
use crate::error::Result;

/// A compiled wgpu program ready for dispatch.
pub struct WgpuCompiledKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Backing store of the program's `ProgramUniforms` block.
    pub uniform_buffer: wgpu::Buffer,
    pub num_bindings: usize,
}

/// Compile an assembled WGSL program into a compute pipeline.
///
/// The bind group layout is derived from shader reflection, which handles
/// the mixed storage/uniform bindings of assembled programs.
pub fn compile_wgsl(
    ctx: &WgpuContext,
    kernel: &AssembledKernel,
    uniform_bytes: usize,
) -> Result<WgpuCompiledKernel> {
    let shader_module = ctx
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tensor_gpu_program"),
            source: wgpu::ShaderSource::Wgsl(kernel.source.as_str().into()),
        });

    let pipeline = ctx
        .device
        .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("tensor_gpu_pipeline"),
            layout: None,
            module: &shader_module,
            entry_point: Some(kernel.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

    let bind_group_layout = pipeline.get_bind_group_layout(0);

    let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tensor_gpu_uniforms"),
        size: uniform_bytes as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    Ok(WgpuCompiledKernel {
        pipeline,
        bind_group_layout,
        uniform_buffer,
        num_bindings: kernel.num_bindings,
    })
}
