//! Backend abstraction: thin enum dispatch over Metal, wgpu and the host.
//!
//! `NativeContext` and `NativeCompiledKernel` wrap the backend-specific
//! types. The GPU arms exist only when their feature is enabled; the `Host`
//! arm is always present, so a context can be created on any machine.

use crate::codegen::ShaderLang;
use crate::config::{BackendPreference, GpuConfig};
use crate::error::{Error, Result};
use crate::host::{self, HostProgram};
use crate::program::UniformBlock;

#[cfg(feature = "metal-backend")]
use crate::metal::{compile::CompiledKernel, device_init::MetalContext};

#[cfg(feature = "webgpu-backend")]
use crate::wgpu_backend::{compile::WgpuCompiledKernel, device_init::WgpuContext};

// ---------------------------------------------------------------------------
// NativeContext
// ---------------------------------------------------------------------------

pub enum NativeContext {
    #[cfg(feature = "metal-backend")]
    Metal(MetalContext),
    #[cfg(feature = "webgpu-backend")]
    Wgpu(WgpuContext),
    Host,
}

impl NativeContext {
    /// Create a context for the configured backend.
    ///
    /// `Auto` tries Metal, then wgpu, then settles on the host backend.
    /// An explicit GPU preference fails if that backend cannot be created.
    pub fn new(config: &GpuConfig) -> Result<Self> {
        match config.backend {
            BackendPreference::Auto => Ok(Self::best_available(config)),
            BackendPreference::Host => Ok(NativeContext::Host),
            BackendPreference::Metal => Self::metal(),
            BackendPreference::Wgpu => Self::wgpu(config),
        }
    }

    #[allow(unused_variables)]
    fn best_available(config: &GpuConfig) -> Self {
        #[cfg(feature = "metal-backend")]
        {
            if let Some(ctx) = MetalContext::new() {
                return NativeContext::Metal(ctx);
            }
        }
        #[cfg(feature = "webgpu-backend")]
        {
            if let Some(ctx) = WgpuContext::new(config.power) {
                return NativeContext::Wgpu(ctx);
            }
        }
        log::warn!("no GPU backend available, using host execution");
        NativeContext::Host
    }

    fn metal() -> Result<Self> {
        #[cfg(feature = "metal-backend")]
        {
            if let Some(ctx) = MetalContext::new() {
                return Ok(NativeContext::Metal(ctx));
            }
        }
        Err(Error::BackendUnavailable { backend: "metal" })
    }

    #[allow(unused_variables)]
    fn wgpu(config: &GpuConfig) -> Result<Self> {
        #[cfg(feature = "webgpu-backend")]
        {
            if let Some(ctx) = WgpuContext::new(config.power) {
                return Ok(NativeContext::Wgpu(ctx));
            }
        }
        Err(Error::BackendUnavailable { backend: "wgpu" })
    }

    /// Check if any GPU backend is available.
    pub fn is_gpu_available() -> bool {
        #[cfg(feature = "metal-backend")]
        {
            if MetalContext::is_available() {
                return true;
            }
        }
        #[cfg(feature = "webgpu-backend")]
        {
            if WgpuContext::is_available() {
                return true;
            }
        }
        false
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "metal-backend")]
            NativeContext::Metal(_) => "metal",
            #[cfg(feature = "webgpu-backend")]
            NativeContext::Wgpu(_) => "wgpu",
            NativeContext::Host => "host",
        }
    }

    /// Kernel language programs must be generated in for this backend.
    pub fn shader_lang(&self) -> ShaderLang {
        match self {
            #[cfg(feature = "metal-backend")]
            NativeContext::Metal(_) => ShaderLang::Msl,
            #[cfg(feature = "webgpu-backend")]
            NativeContext::Wgpu(_) => ShaderLang::Wgsl,
            NativeContext::Host => ShaderLang::Wgsl,
        }
    }

    /// Compile a program for this backend.
    #[allow(unused_variables)]
    pub fn compile<P: HostProgram>(&self, program: &P) -> Result<NativeCompiledKernel> {
        match self {
            #[cfg(feature = "metal-backend")]
            NativeContext::Metal(ctx) => {
                let assembled = crate::codegen::assemble(program);
                let compiled = crate::metal::compile::compile_msl(ctx, &assembled)?;
                Ok(NativeCompiledKernel::Metal(compiled))
            }
            #[cfg(feature = "webgpu-backend")]
            NativeContext::Wgpu(ctx) => {
                let assembled = crate::codegen::assemble(program);
                let uniform_bytes = UniformBlock::new(program.uniforms()).as_bytes().len();
                let compiled =
                    crate::wgpu_backend::compile::compile_wgsl(ctx, &assembled, uniform_bytes)?;
                Ok(NativeCompiledKernel::Wgpu(compiled))
            }
            NativeContext::Host => Ok(NativeCompiledKernel::Host),
        }
    }

    /// Run a compiled program and read back its output.
    pub fn dispatch<P: HostProgram>(
        &self,
        kernel: &NativeCompiledKernel,
        program: &P,
        inputs: &[&[f32]],
        uniforms: &UniformBlock,
    ) -> Result<Vec<f32>> {
        match (self, kernel) {
            #[cfg(feature = "metal-backend")]
            (NativeContext::Metal(ctx), NativeCompiledKernel::Metal(k)) => {
                crate::metal::dispatch::dispatch(ctx, k, inputs, uniforms)
            }
            #[cfg(feature = "webgpu-backend")]
            (NativeContext::Wgpu(ctx), NativeCompiledKernel::Wgpu(k)) => {
                crate::wgpu_backend::dispatch::dispatch(ctx, k, inputs, uniforms)
            }
            (NativeContext::Host, NativeCompiledKernel::Host) => {
                host::dispatch(program, inputs, uniforms)
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::Backend(format!(
                "kernel was not compiled for the {} backend",
                self.name()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// NativeCompiledKernel
// ---------------------------------------------------------------------------

pub enum NativeCompiledKernel {
    #[cfg(feature = "metal-backend")]
    Metal(CompiledKernel),
    #[cfg(feature = "webgpu-backend")]
    Wgpu(WgpuCompiledKernel),
    Host,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_context() {
        let config = GpuConfig::default().with_backend(BackendPreference::Host);
        let ctx = NativeContext::new(&config).unwrap();
        assert_eq!(ctx.name(), "host");
        assert_eq!(ctx.shader_lang(), ShaderLang::Wgsl);
    }

    #[test]
    fn test_auto_always_succeeds() {
        let ctx = NativeContext::new(&GpuConfig::default()).unwrap();
        println!("auto-selected backend: {}", ctx.name());
    }

    #[cfg(not(feature = "metal-backend"))]
    #[test]
    fn test_missing_metal_backend() {
        let config = GpuConfig::default().with_backend(BackendPreference::Metal);
        assert!(matches!(
            NativeContext::new(&config),
            Err(Error::BackendUnavailable { backend: "metal" })
        ));
    }
}
