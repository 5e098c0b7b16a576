//! Categorical (multinomial) sampling program.
//!
//! Each of the `num_samples` invocations draws one outcome index from the
//! probability vector `probs` by CDF inversion:
//!
//! 1. `r = fract(cos(dot(resultUV * seed, K1)) * 12345.6789)`, where
//!    `resultUV` is the invocation's normalized output coordinate and
//!    `K1 = (e^pi, 2^sqrt(2))`.
//! 2. The first index `i` with `r < probs[0] + .. + probs[i]` is written.
//! 3. If no prefix sum exceeds `r` the last index is written.
//!
//! The seed is a uniform, not part of the kernel text, so one compiled
//! program serves every call. [`MultinomialProgram::seed_setup`] returns
//! the hook that writes it before each dispatch.

use std::sync::OnceLock;

use crate::codegen::{ShaderLang, PROGRAM_MAIN};
use crate::error::Result;
use crate::host::HostKernel;
use crate::program::{
    require_kernel_size, GpuProgram, InputBinding, ProgramParam, UniformBinder, UniformBlock,
    UniformDecl, UniformLocation,
};

/// Name of the per-dispatch seed uniform.
pub const SEED_UNIFORM: &str = "seed";

/// Gelfond's constant, e^pi.
pub const K1_X: f64 = 23.14069263277926;
/// Gelfond-Schneider constant, 2^sqrt(2).
pub const K1_Y: f64 = 2.665144142690225;
/// Scale applied to the cosine before taking the fractional part.
pub const HASH_SCALE: f64 = 12345.6789;

const UNIFORMS: [UniformDecl; 1] = [UniformDecl::f32(SEED_UNIFORM)];

/// Draws `num_samples` outcome indices from `probs` (`num_outcomes` values).
#[derive(Debug, Clone)]
pub struct MultinomialProgram {
    num_outcomes: usize,
    num_samples: usize,
    lang: ShaderLang,
    inputs: Vec<InputBinding>,
    output_shape: Vec<usize>,
    body: String,
    seed_location: OnceLock<UniformLocation>,
}

impl MultinomialProgram {
    pub fn new(num_outcomes: usize, num_samples: usize) -> Result<Self> {
        Self::with_lang(num_outcomes, num_samples, ShaderLang::default())
    }

    pub fn with_lang(num_outcomes: usize, num_samples: usize, lang: ShaderLang) -> Result<Self> {
        require_kernel_size("num_outcomes", num_outcomes)?;
        require_kernel_size("num_samples", num_samples)?;
        Ok(MultinomialProgram {
            num_outcomes,
            num_samples,
            lang,
            inputs: vec![InputBinding::new("probs", vec![num_outcomes])],
            output_shape: vec![num_samples],
            body: emit_body(num_outcomes, lang),
            seed_location: OnceLock::new(),
        })
    }

    pub fn num_outcomes(&self) -> usize {
        self.num_outcomes
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Setup hook writing `seed` into the compiled program's seed uniform.
    ///
    /// The location is resolved through the binder on first use and cached
    /// on the program for every later dispatch.
    pub fn seed_setup(&self, seed: f32) -> impl Fn(&mut dyn UniformBinder) -> Result<()> + '_ {
        move |binder: &mut dyn UniformBinder| {
            let location = match self.seed_location.get() {
                Some(location) => *location,
                None => {
                    let resolved = binder.uniform_location(SEED_UNIFORM)?;
                    *self.seed_location.get_or_init(|| resolved)
                }
            };
            binder.set_uniform_f32(location, seed);
            Ok(())
        }
    }
}

fn emit_body(num_outcomes: usize, lang: ShaderLang) -> String {
    let d = lang.dialect();
    let f = d.float_ty();

    let k1 = d.const_decl(
        "K1",
        d.vec2_ty(),
        &d.vec2(&d.float_lit(K1_X), &d.float_lit(K1_Y)),
    );

    let random = d.function(
        "random",
        &[("seed", f)],
        Some(f),
        &format!(
            "return fract(cos(dot(resultUV * seed, K1)) * {});",
            d.float_lit(HASH_SCALE)
        ),
    );

    let step = [
        "cdf += getProbs(i);".to_string(),
        format!(
            "if (r < cdf) {{\n    setOutput({});\n    return;\n}}",
            d.to_float("i")
        ),
    ]
    .join("\n");

    let main = [
        d.local("r", f, &format!("random({})", d.uniform(SEED_UNIFORM))),
        d.local("cdf", f, &d.float_lit(0.0)),
        d.for_range("i", num_outcomes, &step),
        format!("setOutput({});", d.to_float(&(num_outcomes - 1).to_string())),
    ]
    .join("\n");

    [k1, random, d.function(PROGRAM_MAIN, &[], None, &main)].join("\n\n")
}

impl GpuProgram for MultinomialProgram {
    fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn params(&self) -> &[ProgramParam] {
        &[]
    }

    fn lang(&self) -> ShaderLang {
        self.lang
    }

    fn uniforms(&self) -> &[UniformDecl] {
        &UNIFORMS
    }
}

/// Normalized output coordinate of element `index` in a 1-D output of `numel`.
pub fn result_uv(index: usize, numel: usize) -> [f32; 2] {
    [(index as f32 + 0.5) / numel as f32, 0.5]
}

/// Largest `f32` below 1.0.
const ONE_BELOW: f32 = 1.0 - f32::EPSILON / 2.0;

/// `fract(cos(dot(uv * seed, K1)) * 12345.6789)` in `f32` arithmetic, in `[0, 1)`.
pub fn pseudo_random(uv: [f32; 2], seed: f32) -> f32 {
    let dot = (uv[0] * seed) * K1_X as f32 + (uv[1] * seed) * K1_Y as f32;
    let x = dot.cos() * HASH_SCALE as f32;
    // x - floor(x) rounds up to 1.0 for tiny negative x
    (x - x.floor()).min(ONE_BELOW)
}

/// CDF inversion: first `i` with `r < probs[..=i].sum()`, else the last index.
pub fn sample_index(probs: &[f32], r: f32) -> usize {
    let mut cdf = 0.0f32;
    for (i, p) in probs.iter().enumerate() {
        cdf += p;
        if r < cdf {
            return i;
        }
    }
    probs.len() - 1
}

impl HostKernel for MultinomialProgram {
    fn run_host(&self, inputs: &[&[f32]], uniforms: &UniformBlock) -> Vec<f32> {
        let probs = &inputs[0][..self.num_outcomes];
        // Unset uniforms read as zero, as on the device.
        let seed = uniforms
            .uniform_location(SEED_UNIFORM)
            .map(|location| uniforms.get_f32(location))
            .unwrap_or_default();
        (0..self.num_samples)
            .map(|index| {
                let r = pseudo_random(result_uv(index, self.num_samples), seed);
                sample_index(probs, r) as f32
            })
            .collect()
    }
}
