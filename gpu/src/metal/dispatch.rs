//! Metal program dispatch: binds buffers, encodes and submits GPU work.

use objc2_metal::MTLCommandBuffer;
use objc2_metal::MTLCommandEncoder;
use objc2_metal::MTLCommandQueue;
use objc2_metal::MTLComputeCommandEncoder;
use objc2_metal::MTLSize;

use super::buffer_ops::MetalBuffer;
use super::compile::CompiledKernel;
use super::device_init::MetalContext;
use crate::codegen::WORKGROUP_SIZE;
use crate::error::{Error, Result};
use crate::program::UniformBlock;

fn backend_err(msg: &str) -> Error {
    Error::Backend(msg.to_string())
}

/// Run a compiled program over `uniforms.numel()` threads.
///
/// Binding order matches `codegen::msl::assemble`: inputs, result, uniforms.
pub fn dispatch(
    ctx: &MetalContext,
    kernel: &CompiledKernel,
    inputs: &[&[f32]],
    uniforms: &UniformBlock,
) -> Result<Vec<f32>> {
    let numel = uniforms.numel();

    let mut buffers = inputs
        .iter()
        .map(|data| {
            MetalBuffer::from_bytes(ctx, bytemuck::cast_slice(data))
                .ok_or_else(|| backend_err("failed to create input buffer"))
        })
        .collect::<Result<Vec<_>>>()?;
    let output_index = buffers.len();
    buffers.push(
        MetalBuffer::allocate(ctx, numel * std::mem::size_of::<f32>())
            .ok_or_else(|| backend_err("failed to allocate output buffer"))?,
    );
    buffers.push(
        MetalBuffer::from_bytes(ctx, uniforms.as_bytes())
            .ok_or_else(|| backend_err("failed to create uniform buffer"))?,
    );

    let command_buffer = ctx
        .command_queue
        .commandBuffer()
        .ok_or_else(|| backend_err("failed to create command buffer"))?;

    let encoder = command_buffer
        .computeCommandEncoder()
        .ok_or_else(|| backend_err("failed to create compute encoder"))?;

    encoder.setComputePipelineState(&kernel.pipeline);

    for (i, buf) in buffers.iter().enumerate() {
        unsafe {
            encoder.setBuffer_offset_atIndex(Some(&buf.mtl_buffer), 0, i);
        }
    }

    let threads_per_group = kernel
        .max_threads_per_group
        .min(WORKGROUP_SIZE as usize)
        .min(numel);
    let grid_size = MTLSize {
        width: numel,
        height: 1,
        depth: 1,
    };
    let threadgroup_size = MTLSize {
        width: threads_per_group,
        height: 1,
        depth: 1,
    };

    encoder.dispatchThreads_threadsPerThreadgroup(grid_size, threadgroup_size);

    encoder.endEncoding();
    command_buffer.commit();
    command_buffer.waitUntilCompleted();

    Ok(buffers[output_index].read_f32(numel))
}
