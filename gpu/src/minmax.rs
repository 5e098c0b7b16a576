//! Min/max reduction program.
//!
//! A single invocation scans the flattened input `A` from index 0 to
//! `a_size - 1`, keeping a running accumulator seeded with `A[0]`. A NaN
//! candidate is written immediately and ends the scan, so NaN wins over any
//! value accumulated before it.

use std::fmt;
use std::str::FromStr;

use crate::codegen::{ShaderLang, PROGRAM_MAIN};
use crate::error::{Error, Result};
use crate::host::HostKernel;
use crate::program::{
    require_kernel_size, GpuProgram, InputBinding, ProgramParam, UniformBlock,
};

/// Which extremum the reduction keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Min,
    Max,
}

impl ReduceOp {
    /// Intrinsic name, shared by WGSL and MSL.
    pub fn name(self) -> &'static str {
        match self {
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
        }
    }

    /// `f32::min`/`f32::max` agree with the GPU intrinsics for non-NaN operands.
    pub fn apply(self, acc: f32, candidate: f32) -> f32 {
        match self {
            ReduceOp::Min => acc.min(candidate),
            ReduceOp::Max => acc.max(candidate),
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReduceOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "min" => Ok(ReduceOp::Min),
            "max" => Ok(ReduceOp::Max),
            other => Err(Error::invalid_argument(
                "op_type",
                format!("expected 'min' or 'max', got '{other}'"),
            )),
        }
    }
}

/// Reduces `A` (of `a_size` elements) to a scalar minimum or maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxProgram {
    a_size: usize,
    op: ReduceOp,
    lang: ShaderLang,
    inputs: Vec<InputBinding>,
    params: Vec<ProgramParam>,
    body: String,
}

impl MinMaxProgram {
    pub fn new(a_size: usize, op: ReduceOp) -> Result<Self> {
        Self::with_lang(a_size, op, ShaderLang::default())
    }

    pub fn with_lang(a_size: usize, op: ReduceOp, lang: ShaderLang) -> Result<Self> {
        require_kernel_size("a_size", a_size)?;
        Ok(MinMaxProgram {
            a_size,
            op,
            lang,
            inputs: vec![InputBinding::new("A", vec![a_size])],
            params: vec![ProgramParam::Str(op.name())],
            body: emit_body(a_size, op, lang),
        })
    }

    pub fn a_size(&self) -> usize {
        self.a_size
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }
}

fn emit_body(a_size: usize, op: ReduceOp, lang: ShaderLang) -> String {
    let d = lang.dialect();
    let f = d.float_ty();

    let step = [
        d.local("candidate", f, "getAFlat(i)"),
        format!(
            "if ({}) {{\n    setOutput(candidate);\n    return;\n}}",
            d.is_nan("candidate")
        ),
        format!("value = {}(value, candidate);", op.name()),
    ]
    .join("\n");

    let main = [
        d.local("value", f, "getAFlat(0)"),
        d.for_range("i", a_size, &step),
        "setOutput(value);".to_string(),
    ]
    .join("\n");

    d.function(PROGRAM_MAIN, &[], None, &main)
}

impl GpuProgram for MinMaxProgram {
    fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    fn output_shape(&self) -> &[usize] {
        &[]
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn params(&self) -> &[ProgramParam] {
        &self.params
    }

    fn lang(&self) -> ShaderLang {
        self.lang
    }
}

impl HostKernel for MinMaxProgram {
    fn run_host(&self, inputs: &[&[f32]], _uniforms: &UniformBlock) -> Vec<f32> {
        let a = inputs[0];
        let mut value = a[0];
        for &candidate in &a[..self.a_size] {
            if candidate.is_nan() {
                return vec![candidate];
            }
            value = self.op.apply(value, candidate);
        }
        vec![value]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::MAX_KERNEL_SIZE;

    fn run(op: ReduceOp, data: &[f32]) -> f32 {
        let program = MinMaxProgram::new(data.len(), op).unwrap();
        let block = UniformBlock::new(program.uniforms());
        program.run_host(&[data], &block)[0]
    }

    #[test]
    fn test_wgsl_body() {
        let program = MinMaxProgram::new(5, ReduceOp::Min).unwrap();
        let body = program.body();
        assert!(body.starts_with("fn program_main() {"));
        assert!(body.contains("var value: f32 = getAFlat(0);"));
        assert!(body.contains("for (var i: i32 = 0; i < 5; i++) {"));
        assert!(body.contains("if (isNaN(candidate)) {"));
        assert!(body.contains("value = min(value, candidate);"));
        assert!(body.trim_end().ends_with("setOutput(value);\n}"));
    }

    #[test]
    fn test_msl_body_uses_same_algorithm() {
        let program = MinMaxProgram::with_lang(8, ReduceOp::Max, ShaderLang::Msl).unwrap();
        let body = program.body();
        assert!(body.starts_with("void program_main() {"));
        assert!(body.contains("float value = getAFlat(0);"));
        assert!(body.contains("for (int i = 0; i < 8; i++) {"));
        assert!(body.contains("if (isnan(candidate)) {"));
        assert!(body.contains("value = max(value, candidate);"));
    }

    #[test]
    fn test_descriptor() {
        let program = MinMaxProgram::new(12, ReduceOp::Max).unwrap();
        assert_eq!(program.output_shape(), &[] as &[usize]);
        assert_eq!(program.output_numel(), 1);
        assert_eq!(program.inputs(), &[InputBinding::new("A", vec![12])]);
        assert_eq!(program.params(), &[ProgramParam::Str("max")]);
        assert!(program.uniforms().is_empty());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            MinMaxProgram::new(0, ReduceOp::Min),
            Err(Error::InvalidArgument { arg: "a_size", .. })
        ));
    }

    #[test]
    fn test_oversized_rejected() {
        assert!(MinMaxProgram::new(MAX_KERNEL_SIZE, ReduceOp::Max).is_ok());
        assert!(matches!(
            MinMaxProgram::new(MAX_KERNEL_SIZE + 1, ReduceOp::Max),
            Err(Error::InvalidArgument { arg: "a_size", .. })
        ));
    }

    #[test]
    fn test_op_parsing() {
        assert_eq!("min".parse::<ReduceOp>().unwrap(), ReduceOp::Min);
        assert_eq!("max".parse::<ReduceOp>().unwrap(), ReduceOp::Max);
        assert!("sum".parse::<ReduceOp>().is_err());
        assert_eq!(ReduceOp::Max.to_string(), "max");
    }

    #[test]
    fn test_host_min_max() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(run(ReduceOp::Min, &data), 1.0);
        assert_eq!(run(ReduceOp::Max, &data), 5.0);
    }

    #[test]
    fn test_host_nan_wins_anywhere() {
        for data in [
            [f32::NAN, 3.0, 5.0],
            [3.0, f32::NAN, 5.0],
            [3.0, 5.0, f32::NAN],
        ] {
            assert!(run(ReduceOp::Min, &data).is_nan());
            assert!(run(ReduceOp::Max, &data).is_nan());
        }
    }

    #[test]
    fn test_host_single_element() {
        assert_eq!(run(ReduceOp::Min, &[-2.5]), -2.5);
        assert_eq!(run(ReduceOp::Max, &[-2.5]), -2.5);
    }

    #[test]
    fn test_host_infinities() {
        let data = [f32::NEG_INFINITY, 0.0, f32::INFINITY];
        assert_eq!(run(ReduceOp::Min, &data), f32::NEG_INFINITY);
        assert_eq!(run(ReduceOp::Max, &data), f32::INFINITY);
    }
}
