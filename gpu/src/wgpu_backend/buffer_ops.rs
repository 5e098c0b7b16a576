//! WebGPU buffer operations: GPU memory allocation and data transfer

use wgpu::util::DeviceExt;

use super::device_init::WgpuContext;
use crate::error::{Error, Result};

/// WebGPU-specific GPU buffer wrapping a wgpu::Buffer.
pub struct WgpuBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) byte_size: usize,
}

impl WgpuBuffer {
    /// Create a storage buffer initialized with `data`.
    pub fn from_data(ctx: &WgpuContext, data: &[f32]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tensor_gpu_input"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });

        Some(WgpuBuffer {
            buffer,
            byte_size: std::mem::size_of_val(data),
        })
    }

    /// Allocate an empty storage buffer of the given byte size.
    pub fn allocate(ctx: &WgpuContext, byte_size: usize) -> Option<Self> {
        if byte_size == 0 {
            return None;
        }

        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tensor_gpu_output"),
            size: byte_size as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Some(WgpuBuffer { buffer, byte_size })
    }

    /// Read `numel` floats back to the CPU via a staging buffer.
    pub fn read_f32(&self, ctx: &WgpuContext, numel: usize) -> Result<Vec<f32>> {
        let read_size = (numel * std::mem::size_of::<f32>()).min(self.byte_size);

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tensor_gpu_staging"),
            size: read_size as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tensor_gpu_readback"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, read_size as u64);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = bytemuck::cast_slice::<u8, f32>(&slice.get_mapped_range()).to_vec();
                staging.unmap();
                Ok(data)
            }
            Ok(Err(e)) => Err(Error::Backend(format!("buffer map failed: {e}"))),
            Err(e) => Err(Error::Backend(format!("buffer map callback dropped: {e}"))),
        }
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }
}
