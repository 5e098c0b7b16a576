//! tensor-gpu: GPU program generators for tensor operations.
//!
//! A tensor operation is compiled into a *program*: a [`GpuProgram`]
//! descriptor pairing named input bindings, an output shape and
//! bookkeeping params with a kernel body generated for one target
//! language. Two generators are provided:
//!
//! - [`MinMaxProgram`]: scalar min/max over a flattened input, NaN wins.
//! - [`MultinomialProgram`]: categorical sampling by CDF inversion, seeded
//!   per dispatch through a setup hook so the compiled kernel is reused.
//!
//! [`GpuContext`] compiles programs for the selected backend (Metal with
//! `metal-backend`, wgpu with `webgpu-backend`, or the always-available host
//! reference backend), caches them, and dispatches one invocation per
//! output element.
//!
//! ```rust,ignore
//! use tensor_gpu::GpuContext;
//!
//! let mut ctx = GpuContext::new()?;
//! let lo = ctx.min(&[3.0, 1.0, 4.0])?;
//! let draws = ctx.multinomial(&[0.2, 0.8], 10, Some(0.5), true)?;
//! ```

pub mod backend;
pub mod codegen;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod kernel_cache;
pub mod logging;
pub mod minmax;
pub mod multinomial;
pub mod ops;
pub mod program;

#[cfg(feature = "metal-backend")]
pub mod metal;

#[cfg(feature = "webgpu-backend")]
pub mod wgpu_backend;

pub use codegen::ShaderLang;
pub use config::{BackendPreference, GpuConfig, PowerPreference};
pub use device::GpuContext;
pub use error::{Error, Result};
pub use host::{HostKernel, HostProgram};
pub use minmax::{MinMaxProgram, ReduceOp};
pub use multinomial::MultinomialProgram;
pub use program::{
    GpuProgram, InputBinding, ProgramParam, SetupFn, UniformBinder, UniformBlock, UniformDecl,
    UniformLocation,
};
