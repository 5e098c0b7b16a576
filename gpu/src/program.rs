//! Program descriptors: the contract every generated kernel satisfies.
//!
//! A `GpuProgram` pairs a declarative description (named input bindings,
//! output shape, per-instance params, declared uniforms) with a kernel body
//! written in one target language. The executor treats every program the
//! same way: it wraps the body with the accessor prelude from `codegen`,
//! binds the inputs by name, allocates `output_shape()` and dispatches one
//! invocation per output element.
//!
//! Per-dispatch scalars (seeds) live in a [`UniformBlock`] owned by the
//! compiled program instance. Callers push values into it through a setup
//! hook right before dispatch, so the compiled kernel is never rebuilt.

use std::fmt;

use crate::codegen::ShaderLang;
use crate::error::{Error, Result};

/// A named tensor the kernel reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputBinding {
    pub name: &'static str,
    pub shape: Vec<usize>,
}

impl InputBinding {
    pub fn new(name: &'static str, shape: Vec<usize>) -> Self {
        InputBinding { name, shape }
    }

    /// Total element count of the bound tensor.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Opaque per-instance value used for bookkeeping and cache keys only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgramParam {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl fmt::Display for ProgramParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramParam::Int(v) => write!(f, "{v}"),
            ProgramParam::Float(v) => write!(f, "{v:?}"),
            ProgramParam::Str(v) => f.write_str(v),
        }
    }
}

/// An external scalar `f32` uniform referenced by the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformDecl {
    pub name: &'static str,
}

impl UniformDecl {
    pub const fn f32(name: &'static str) -> Self {
        UniformDecl { name }
    }
}

/// Resolved position of a uniform inside a program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) usize);

/// Handle to a compiled program instance that accepts uniform writes.
pub trait UniformBinder {
    /// Resolve a declared uniform by name.
    fn uniform_location(&self, name: &str) -> Result<UniformLocation>;

    /// Write a scalar into a resolved location.
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);
}

/// Setup hook run once per dispatch, immediately before submission.
pub type SetupFn<'a> = dyn Fn(&mut dyn UniformBinder) -> Result<()> + 'a;

/// Words reserved at the start of every uniform block (`numel`).
const HEADER_WORDS: usize = 1;

/// CPU-side staging of a program's `ProgramUniforms` block.
///
/// Layout: word 0 is the output element count (`u32`), followed by one
/// `f32` word per declared uniform in declaration order, zero padded to a
/// multiple of 16 bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    names: Vec<&'static str>,
    words: Vec<u32>,
}

impl UniformBlock {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let used = HEADER_WORDS + decls.len();
        let padded = used.div_ceil(4) * 4;
        UniformBlock {
            names: decls.iter().map(|d| d.name).collect(),
            words: vec![0; padded],
        }
    }

    pub fn set_numel(&mut self, numel: usize) {
        self.words[0] = numel as u32;
    }

    pub fn numel(&self) -> usize {
        self.words[0] as usize
    }

    /// Read back the scalar stored at `location`.
    pub fn get_f32(&self, location: UniformLocation) -> f32 {
        f32::from_bits(self.words[location.0])
    }

    /// Raw bytes ready for upload to a uniform buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Number of padding words appended after the declared uniforms.
    pub fn padding_words(&self) -> usize {
        self.words.len() - HEADER_WORDS - self.names.len()
    }
}

impl UniformBinder for UniformBlock {
    fn uniform_location(&self, name: &str) -> Result<UniformLocation> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(HEADER_WORDS + i))
            .ok_or_else(|| Error::UnknownUniform {
                name: name.to_string(),
            })
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.words[location.0] = value.to_bits();
    }
}

/// Contract every kernel generator implements.
pub trait GpuProgram {
    /// Ordered input bindings, referenced by name inside the body.
    fn inputs(&self) -> &[InputBinding];

    /// Shape the executor allocates for the result. Empty means scalar.
    fn output_shape(&self) -> &[usize];

    /// Kernel source in [`GpuProgram::lang`].
    fn body(&self) -> &str;

    /// Per-instance bookkeeping values; never executed.
    fn params(&self) -> &[ProgramParam];

    /// Target language of `body()`.
    fn lang(&self) -> ShaderLang;

    /// External scalar uniforms the body reads.
    fn uniforms(&self) -> &[UniformDecl] {
        &[]
    }

    /// Number of invocations: one per output element.
    fn output_numel(&self) -> usize {
        self.output_shape().iter().product()
    }
}

/// Cache key identifying a compiled program.
///
/// Two descriptors with the same language, body, params and shapes compile
/// to the same kernel and may share one compiled instance.
pub fn shader_key(program: &dyn GpuProgram) -> String {
    let params: Vec<String> = program.params().iter().map(|p| p.to_string()).collect();
    let inputs: Vec<String> = program
        .inputs()
        .iter()
        .map(|b| format!("{}{:?}", b.name, b.shape))
        .collect();
    format!(
        "{}|{}|{}|{}|{:?}",
        program.lang().name(),
        params.join(","),
        inputs.join(","),
        program.body(),
        program.output_shape()
    )
}

/// Largest size a kernel loop bound or invocation count may take.
///
/// Generated loops count with a 32-bit signed `int`, and `numel` is a `u32`
/// uniform word.
pub const MAX_KERNEL_SIZE: usize = i32::MAX as usize;

/// Reject constructor sizes that are zero or exceed [`MAX_KERNEL_SIZE`].
pub(crate) fn require_kernel_size(arg: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_argument(arg, "must be a positive integer"));
    }
    if value > MAX_KERNEL_SIZE {
        return Err(Error::invalid_argument(
            arg,
            format!("{value} exceeds the kernel size limit {MAX_KERNEL_SIZE}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_block_layout() {
        let block = UniformBlock::new(&[UniformDecl::f32("seed")]);
        assert_eq!(block.as_bytes().len(), 16);
        assert_eq!(block.padding_words(), 2);

        let empty = UniformBlock::new(&[]);
        assert_eq!(empty.as_bytes().len(), 16);
        assert_eq!(empty.padding_words(), 3);

        let decls = [
            UniformDecl::f32("a"),
            UniformDecl::f32("b"),
            UniformDecl::f32("c"),
            UniformDecl::f32("d"),
        ];
        assert_eq!(UniformBlock::new(&decls).as_bytes().len(), 32);
    }

    #[test]
    fn test_uniform_write_and_read() {
        let mut block = UniformBlock::new(&[UniformDecl::f32("seed"), UniformDecl::f32("scale")]);
        block.set_numel(7);

        let seed = block.uniform_location("seed").unwrap();
        let scale = block.uniform_location("scale").unwrap();
        assert_ne!(seed, scale);

        block.set_uniform_f32(seed, 0.25);
        block.set_uniform_f32(scale, -3.5);
        assert_eq!(block.numel(), 7);
        assert_eq!(block.get_f32(seed), 0.25);
        assert_eq!(block.get_f32(scale), -3.5);

        let words: &[u32] = bytemuck::cast_slice(block.as_bytes());
        assert_eq!(words[0], 7);
        assert_eq!(f32::from_bits(words[1]), 0.25);
    }

    #[test]
    fn test_unknown_uniform() {
        let block = UniformBlock::new(&[UniformDecl::f32("seed")]);
        let err = block.uniform_location("offset").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownUniform {
                name: "offset".to_string()
            }
        );
    }

    #[test]
    fn test_param_display() {
        assert_eq!(ProgramParam::Str("min").to_string(), "min");
        assert_eq!(ProgramParam::Int(-4).to_string(), "-4");
        assert_eq!(ProgramParam::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_binding_numel() {
        assert_eq!(InputBinding::new("A", vec![2, 3]).numel(), 6);
        assert_eq!(InputBinding::new("A", vec![]).numel(), 1);
    }

    #[test]
    fn test_require_kernel_size() {
        assert!(require_kernel_size("n", 1).is_ok());
        assert!(require_kernel_size("n", MAX_KERNEL_SIZE).is_ok());
        assert!(matches!(
            require_kernel_size("n", 0),
            Err(Error::InvalidArgument { arg: "n", .. })
        ));
        assert!(matches!(
            require_kernel_size("n", MAX_KERNEL_SIZE + 1),
            Err(Error::InvalidArgument { arg: "n", .. })
        ));
    }
}
