//! WebGPU program dispatch: uploads uniforms, encodes and submits GPU work.

use super::buffer_ops::WgpuBuffer;
use super::compile::WgpuCompiledKernel;
use super::device_init::WgpuContext;
use crate::codegen::WORKGROUP_SIZE;
use crate::error::{Error, Result};
use crate::program::UniformBlock;

/// Run a compiled program over `uniforms.numel()` invocations.
///
/// The uniform block is written to the queue before the compute pass is
/// submitted, so every invocation observes the values the setup hook wrote.
pub fn dispatch(
    ctx: &WgpuContext,
    kernel: &WgpuCompiledKernel,
    inputs: &[&[f32]],
    uniforms: &UniformBlock,
) -> Result<Vec<f32>> {
    let numel = uniforms.numel();
    let input_buffers = inputs
        .iter()
        .map(|data| {
            WgpuBuffer::from_data(ctx, data)
                .ok_or_else(|| Error::Backend("failed to create input buffer".to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    let output = WgpuBuffer::allocate(ctx, numel * std::mem::size_of::<f32>())
        .ok_or_else(|| Error::Backend("failed to allocate output buffer".to_string()))?;

    ctx.queue
        .write_buffer(&kernel.uniform_buffer, 0, uniforms.as_bytes());

    let mut entries: Vec<wgpu::BindGroupEntry> = input_buffers
        .iter()
        .chain(std::iter::once(&output))
        .enumerate()
        .map(|(i, buf)| wgpu::BindGroupEntry {
            binding: i as u32,
            resource: buf.buffer.as_entire_binding(),
        })
        .collect();
    entries.push(wgpu::BindGroupEntry {
        binding: entries.len() as u32,
        resource: kernel.uniform_buffer.as_entire_binding(),
    });
    debug_assert_eq!(entries.len(), kernel.num_bindings);

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("tensor_gpu_dispatch_bg"),
        layout: &kernel.bind_group_layout,
        entries: &entries,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tensor_gpu_dispatch"),
        });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("tensor_gpu_compute_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(numel.div_ceil(WORKGROUP_SIZE as usize) as u32, 1, 1);
    }

    ctx.queue.submit(std::iter::once(encoder.finish()));
    output.read_f32(ctx, numel)
}
