//! Metal device initialization

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_metal::{MTLCommandQueue, MTLCreateSystemDefaultDevice, MTLDevice};

// MTLCreateSystemDefaultDevice requires CoreGraphics to be linked
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {}

/// Metal-specific GPU context wrapping device + command queue.
pub struct MetalContext {
    pub device: Retained<ProtocolObject<dyn MTLDevice>>,
    pub command_queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
}

impl MetalContext {
    /// Create a new Metal context using the system default device.
    pub fn new() -> Option<Self> {
        let device = MTLCreateSystemDefaultDevice()?;
        let command_queue = device.newCommandQueue()?;
        Some(MetalContext {
            device,
            command_queue,
        })
    }

    /// Check if Metal is available on this system.
    pub fn is_available() -> bool {
        MTLCreateSystemDefaultDevice().is_some()
    }
}
