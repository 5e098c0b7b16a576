//! Tensor operations built on the program generators.
//!
//! Each op builds its program in the context's kernel language, so repeated
//! calls with the same sizes hit the kernel cache and only the inputs (and,
//! for sampling, the seed uniform) change between dispatches.

use crate::device::GpuContext;
use crate::error::{Error, Result};
use crate::minmax::{MinMaxProgram, ReduceOp};
use crate::multinomial::MultinomialProgram;

impl GpuContext {
    /// Minimum of all elements; NaN if any element is NaN.
    pub fn min(&mut self, x: &[f32]) -> Result<f32> {
        self.reduce(x, ReduceOp::Min)
    }

    /// Maximum of all elements; NaN if any element is NaN.
    pub fn max(&mut self, x: &[f32]) -> Result<f32> {
        self.reduce(x, ReduceOp::Max)
    }

    fn reduce(&mut self, x: &[f32], op: ReduceOp) -> Result<f32> {
        let program = MinMaxProgram::with_lang(x.len(), op, self.shader_lang())?;
        let out = self.run_program(&program, &[x], None)?;
        out.first()
            .copied()
            .ok_or_else(|| Error::Backend("reduction produced no output".to_string()))
    }

    /// Draw `num_samples` outcome indices from a categorical distribution.
    ///
    /// With `normalized == false`, `probs` holds unnormalized log-probabilities
    /// and is softmax-normalized first. Without a `seed`, one is drawn
    /// uniformly from `[0, 1)`.
    pub fn multinomial(
        &mut self,
        probs: &[f32],
        num_samples: usize,
        seed: Option<f32>,
        normalized: bool,
    ) -> Result<Vec<u32>> {
        let program =
            MultinomialProgram::with_lang(probs.len(), num_samples, self.shader_lang())?;
        let probs = if normalized {
            probs.to_vec()
        } else {
            softmax(probs)
        };
        let seed = seed.unwrap_or_else(rand::random::<f32>);
        log::debug!(
            "multinomial: {} outcomes, {} samples, seed {seed}",
            program.num_outcomes(),
            program.num_samples()
        );

        let setup = program.seed_setup(seed);
        let out = self.run_program(&program, &[&probs], Some(&setup))?;
        Ok(out.into_iter().map(|v| v as u32).collect())
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max() {
        let mut ctx = GpuContext::host();
        let x = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(ctx.min(&x).unwrap(), 1.0);
        assert_eq!(ctx.max(&x).unwrap(), 5.0);
        assert!(ctx.min(&[3.0, f32::NAN, 5.0]).unwrap().is_nan());
    }

    #[test]
    fn test_empty_reduction_rejected() {
        let mut ctx = GpuContext::host();
        assert!(matches!(
            ctx.min(&[]),
            Err(Error::InvalidArgument { arg: "a_size", .. })
        ));
    }

    #[test]
    fn test_softmax() {
        let p = softmax(&[0.0, 0.0]);
        assert!((p[0] - 0.5).abs() < 1e-6 && (p[1] - 0.5).abs() < 1e-6);

        let p = softmax(&[1000.0, 0.0]);
        assert!((p[0] - 1.0).abs() < 1e-6);
        assert!(p.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_multinomial_logits() {
        let mut ctx = GpuContext::host();
        // exp(-1000) underflows to zero: all mass on outcome 1
        let samples = ctx
            .multinomial(&[-1000.0, 0.0, -1000.0], 20, Some(0.3), false)
            .unwrap();
        assert_eq!(samples, vec![1; 20]);
    }

    #[test]
    fn test_multinomial_random_seed() {
        let mut ctx = GpuContext::host();
        let samples = ctx.multinomial(&[0.2, 0.3, 0.5], 50, None, true).unwrap();
        assert_eq!(samples.len(), 50);
        assert!(samples.iter().all(|&s| s < 3));
    }
}
