//! Host reference backend.
//!
//! Every program also evaluates its kernel semantics on the CPU, in the same
//! order and in `f32` arithmetic. The host backend is always compiled in; it
//! serves as the fallback when no GPU is present and as the reference the
//! GPU backends are checked against.

use crate::error::{Error, Result};
use crate::program::{GpuProgram, UniformBlock};

/// CPU evaluation of a program's kernel body.
pub trait HostKernel {
    /// Run every invocation and return the `output_numel()` results.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` does not hold one slice per `GpuProgram::inputs()`
    /// binding, each at least as long as the binding. `GpuContext::run_program`
    /// checks this before dispatching.
    fn run_host(&self, inputs: &[&[f32]], uniforms: &UniformBlock) -> Vec<f32>;
}

/// A program the host backend can execute.
pub trait HostProgram: GpuProgram + HostKernel {}

impl<T: GpuProgram + HostKernel> HostProgram for T {}

/// Dispatch a program on the host.
pub fn dispatch(
    program: &dyn HostProgram,
    inputs: &[&[f32]],
    uniforms: &UniformBlock,
) -> Result<Vec<f32>> {
    let out = program.run_host(inputs, uniforms);
    if out.len() != uniforms.numel() {
        return Err(Error::Backend(format!(
            "host kernel wrote {} values, expected {}",
            out.len(),
            uniforms.numel()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minmax::{MinMaxProgram, ReduceOp};

    #[test]
    fn test_dispatch_checks_output_count() {
        let program = MinMaxProgram::new(3, ReduceOp::Min).unwrap();
        let data = [2.0, -1.0, 4.0];

        let mut block = UniformBlock::new(program.uniforms());
        block.set_numel(program.output_numel());
        assert_eq!(dispatch(&program, &[&data], &block).unwrap(), vec![-1.0]);

        block.set_numel(2);
        assert!(matches!(
            dispatch(&program, &[&data], &block),
            Err(Error::Backend(_))
        ));
    }

    #[test]
    #[should_panic]
    fn test_run_host_requires_checked_inputs() {
        let program = MinMaxProgram::new(3, ReduceOp::Max).unwrap();
        let block = UniformBlock::new(program.uniforms());
        program.run_host(&[], &block);
    }
}
