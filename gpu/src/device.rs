//! GPU compute context: backend selection, program compilation and dispatch

use crate::backend::NativeContext;
use crate::codegen::ShaderLang;
use crate::config::GpuConfig;
use crate::error::{Error, Result};
use crate::host::HostProgram;
use crate::kernel_cache::KernelCache;
use crate::program::SetupFn;

/// Executes programs on one backend, caching compiled kernels.
pub struct GpuContext {
    pub(crate) inner: NativeContext,
    pub(crate) kernel_cache: KernelCache,
}

impl GpuContext {
    /// Create a context configured from the environment (see [`GpuConfig::from_env`]).
    pub fn new() -> Result<Self> {
        Self::with_config(&GpuConfig::from_env())
    }

    pub fn with_config(config: &GpuConfig) -> Result<Self> {
        let inner = NativeContext::new(config)?;
        log::info!("GPU context created on {} backend", inner.name());
        Ok(GpuContext {
            inner,
            kernel_cache: KernelCache::new(),
        })
    }

    /// Context on the always-available host backend.
    pub fn host() -> Self {
        GpuContext {
            inner: NativeContext::Host,
            kernel_cache: KernelCache::new(),
        }
    }

    /// Check if a GPU backend is compiled in and has a device.
    pub fn is_gpu_available() -> bool {
        NativeContext::is_gpu_available()
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.name()
    }

    /// Language programs run on this context must be generated in.
    pub fn shader_lang(&self) -> ShaderLang {
        self.inner.shader_lang()
    }

    pub fn kernel_cache(&self) -> &KernelCache {
        &self.kernel_cache
    }

    /// Run `program` once over `inputs` and return its flattened output.
    ///
    /// The program is compiled on first use and reused afterwards. `setup`
    /// runs against the compiled instance's uniforms right before dispatch.
    pub fn run_program<P: HostProgram>(
        &mut self,
        program: &P,
        inputs: &[&[f32]],
        setup: Option<&SetupFn<'_>>,
    ) -> Result<Vec<f32>> {
        check_inputs(program, inputs)?;
        if program.lang() != self.inner.shader_lang()
            && !matches!(self.inner, NativeContext::Host)
        {
            return Err(Error::invalid_argument(
                "program",
                format!(
                    "{} program cannot run on the {} backend",
                    program.lang().name(),
                    self.inner.name()
                ),
            ));
        }

        let entry = self.kernel_cache.get_or_compile(&self.inner, program)?;
        entry.uniforms.set_numel(program.output_numel());
        if let Some(setup) = setup {
            setup(&mut entry.uniforms)?;
        }

        log::debug!(
            "dispatching {} invocations on {} backend",
            program.output_numel(),
            self.inner.name()
        );
        self.inner
            .dispatch(&entry.compiled, program, inputs, &entry.uniforms)
    }
}

fn check_inputs<P: HostProgram>(program: &P, inputs: &[&[f32]]) -> Result<()> {
    let bindings = program.inputs();
    if bindings.len() != inputs.len() {
        return Err(Error::InputCount {
            expected: bindings.len(),
            got: inputs.len(),
        });
    }
    for (binding, data) in bindings.iter().zip(inputs) {
        if binding.numel() != data.len() {
            return Err(Error::ShapeMismatch {
                name: binding.name.to_string(),
                expected: binding.numel(),
                got: data.len(),
            });
        }
    }
    Ok(())
}

impl Default for GpuContext {
    fn default() -> Self {
        GpuContext::with_config(&GpuConfig::default())
            .unwrap_or_else(|_| GpuContext::host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minmax::{MinMaxProgram, ReduceOp};
    use crate::multinomial::MultinomialProgram;

    #[test]
    fn test_run_minmax_on_host() {
        let mut ctx = GpuContext::host();
        let program = MinMaxProgram::new(5, ReduceOp::Min).unwrap();
        let out = ctx
            .run_program(&program, &[&[3.0, 1.0, 4.0, 1.0, 5.0]], None)
            .unwrap();
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_input_validation() {
        let mut ctx = GpuContext::host();
        let program = MinMaxProgram::new(3, ReduceOp::Max).unwrap();

        assert_eq!(
            ctx.run_program(&program, &[], None).unwrap_err(),
            Error::InputCount {
                expected: 1,
                got: 0
            }
        );
        assert_eq!(
            ctx.run_program(&program, &[&[1.0, 2.0]], None).unwrap_err(),
            Error::ShapeMismatch {
                name: "A".to_string(),
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn test_seed_changes_without_recompiling() {
        let mut ctx = GpuContext::host();
        let program = MultinomialProgram::new(4, 64).unwrap();
        let probs = [0.25, 0.25, 0.25, 0.25];

        let a = ctx
            .run_program(&program, &[&probs], Some(&program.seed_setup(0.11)))
            .unwrap();
        let b = ctx
            .run_program(&program, &[&probs], Some(&program.seed_setup(0.77)))
            .unwrap();
        let a_again = ctx
            .run_program(&program, &[&probs], Some(&program.seed_setup(0.11)))
            .unwrap();

        assert_eq!(ctx.kernel_cache().len(), 1);
        assert_eq!(ctx.kernel_cache().hits(), 2);
        assert_eq!(a, a_again);
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_context() {
        let ctx = GpuContext::default();
        let auto = GpuContext::with_config(&GpuConfig::default()).unwrap();
        assert_eq!(ctx.backend_name(), auto.backend_name());
        println!("default backend: {}", ctx.backend_name());
    }
}
