//! Metal shader compilation: assembled MSL source to MTLComputePipelineState

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{MTLCompileOptions, MTLComputePipelineState, MTLDevice, MTLLibrary};

use super::device_init::MetalContext;
use crate::codegen::AssembledKernel;
use crate::error::{Error, Result};

/// A compiled Metal program ready for dispatch.
pub struct CompiledKernel {
    pub pipeline: Retained<ProtocolObject<dyn MTLComputePipelineState>>,
    /// Maximum threads per threadgroup for this pipeline.
    pub max_threads_per_group: usize,
}

/// Compile options for program kernels.
///
/// Fast math lets the compiler assume NaN never occurs, which folds
/// `isnan` to false and makes `min`/`max` drop NaN operands.
fn program_compile_options() -> Retained<MTLCompileOptions> {
    let options = MTLCompileOptions::new();
    #[allow(deprecated, unused_unsafe)]
    unsafe {
        options.setFastMathEnabled(false);
    }
    options
}

/// Compile an assembled MSL program into a compute pipeline state.
pub fn compile_msl(ctx: &MetalContext, kernel: &AssembledKernel) -> Result<CompiledKernel> {
    let source_ns = NSString::from_str(&kernel.source);
    let options = program_compile_options();
    let library: Retained<ProtocolObject<dyn MTLLibrary>> = ctx
        .device
        .newLibraryWithSource_options_error(&source_ns, Some(&options))
        .map_err(|e| Error::Backend(format!("MSL compilation failed: {e}")))?;

    let fn_name_ns = NSString::from_str(kernel.entry_point);
    let function = library.newFunctionWithName(&fn_name_ns).ok_or_else(|| {
        Error::Backend(format!(
            "kernel function '{}' not found in compiled library",
            kernel.entry_point
        ))
    })?;

    let pipeline: Retained<ProtocolObject<dyn MTLComputePipelineState>> = ctx
        .device
        .newComputePipelineStateWithFunction_error(&function)
        .map_err(|e| Error::Backend(format!("pipeline creation failed: {e}")))?;

    let max_threads_per_group = pipeline.maxTotalThreadsPerThreadgroup() as usize;

    Ok(CompiledKernel {
        pipeline,
        max_threads_per_group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{assemble, ShaderLang};
    use crate::metal::dispatch::dispatch;
    use crate::minmax::{MinMaxProgram, ReduceOp};
    use crate::multinomial::MultinomialProgram;
    use crate::program::{GpuProgram, UniformBinder, UniformBlock};

    #[test]
    fn test_compile_program_kernels() {
        if !MetalContext::is_available() {
            println!("Metal not available, skipping");
            return;
        }

        let ctx = MetalContext::new().unwrap();
        let minmax = MinMaxProgram::with_lang(3, ReduceOp::Max, ShaderLang::Msl).unwrap();
        let sampler = MultinomialProgram::with_lang(4, 16, ShaderLang::Msl).unwrap();

        for kernel in [assemble(&minmax), assemble(&sampler)] {
            let compiled = compile_msl(&ctx, &kernel);
            assert!(compiled.is_ok(), "compilation failed: {:?}", compiled.err());
            assert!(compiled.unwrap().max_threads_per_group > 0);
        }
    }

    #[test]
    fn test_nan_survives_compilation() {
        if !MetalContext::is_available() {
            println!("Metal not available, skipping");
            return;
        }

        let ctx = MetalContext::new().unwrap();
        for op in [ReduceOp::Min, ReduceOp::Max] {
            let program = MinMaxProgram::with_lang(3, op, ShaderLang::Msl).unwrap();
            let kernel = compile_msl(&ctx, &assemble(&program)).unwrap();
            let mut uniforms = UniformBlock::new(program.uniforms());
            uniforms.set_numel(program.output_numel());

            let out = dispatch(&ctx, &kernel, &[&[3.0, f32::NAN, 5.0]], &uniforms).unwrap();
            assert!(out[0].is_nan(), "{op}: got {}", out[0]);
        }
    }

    #[test]
    fn test_sampler_indices_in_range() {
        if !MetalContext::is_available() {
            println!("Metal not available, skipping");
            return;
        }

        let ctx = MetalContext::new().unwrap();
        let program = MultinomialProgram::with_lang(3, 64, ShaderLang::Msl).unwrap();
        let kernel = compile_msl(&ctx, &assemble(&program)).unwrap();
        let mut uniforms = UniformBlock::new(program.uniforms());
        uniforms.set_numel(program.output_numel());
        let seed = uniforms.uniform_location("seed").unwrap();
        uniforms.set_uniform_f32(seed, 0.37);

        let out = dispatch(&ctx, &kernel, &[&[0.2, 0.5, 0.3]], &uniforms).unwrap();
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|&v| v == 0.0 || v == 1.0 || v == 2.0), "{out:?}");
    }
}
