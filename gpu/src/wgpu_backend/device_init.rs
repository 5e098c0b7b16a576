//! WebGPU device initialization via wgpu

use crate::config::PowerPreference;

/// WebGPU-specific GPU context wrapping device + queue.
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

fn power_preference(power: PowerPreference) -> wgpu::PowerPreference {
    match power {
        PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
    }
}

fn request_adapter(power: PowerPreference) -> Option<wgpu::Adapter> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: power_preference(power),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
}

impl WgpuContext {
    /// Create a new wgpu context using the best available adapter.
    pub fn new(power: PowerPreference) -> Option<Self> {
        let adapter = request_adapter(power)?;
        log::debug!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("tensor_gpu"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .ok()?;

        Some(WgpuContext { device, queue })
    }

    /// Check if wgpu is available on this system.
    pub fn is_available() -> bool {
        request_adapter(PowerPreference::default()).is_some()
    }
}
