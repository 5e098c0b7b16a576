//! Metal buffer operations: GPU memory allocation and data transfer

use std::ptr::NonNull;

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_metal::{MTLBuffer, MTLDevice, MTLResourceOptions};

use super::device_init::MetalContext;

/// Metal-specific GPU buffer wrapping an MTLBuffer in shared storage.
pub struct MetalBuffer {
    pub(crate) mtl_buffer: Retained<ProtocolObject<dyn MTLBuffer>>,
    pub(crate) byte_size: usize,
}

impl MetalBuffer {
    /// Create a Metal buffer by copying `data`.
    pub fn from_bytes(ctx: &MetalContext, data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let ptr = NonNull::new(data.as_ptr() as *mut std::ffi::c_void)?;
        let mtl_buffer = unsafe {
            ctx.device.newBufferWithBytes_length_options(
                ptr,
                data.len(),
                MTLResourceOptions::StorageModeShared,
            )
        }?;

        Some(MetalBuffer {
            mtl_buffer,
            byte_size: data.len(),
        })
    }

    /// Allocate an empty Metal buffer of the given size.
    pub fn allocate(ctx: &MetalContext, byte_size: usize) -> Option<Self> {
        if byte_size == 0 {
            return None;
        }

        let mtl_buffer = ctx
            .device
            .newBufferWithLength_options(byte_size, MTLResourceOptions::StorageModeShared)?;

        Some(MetalBuffer {
            mtl_buffer,
            byte_size,
        })
    }

    /// Copy `numel` floats out of shared storage.
    pub fn read_f32(&self, numel: usize) -> Vec<f32> {
        let numel = numel.min(self.byte_size / std::mem::size_of::<f32>());
        let ptr = self.mtl_buffer.contents().as_ptr() as *const f32;
        // Shared storage is CPU-visible once the command buffer has completed.
        unsafe { std::slice::from_raw_parts(ptr, numel) }.to_vec()
    }
}
