//! GPU kernel source code generation.
//!
//! Generators write program bodies through the [`KernelDialect`] trait,
//! which knows the syntax of one target language. The same generator
//! therefore produces WGSL or MSL without touching its algorithm.
//! [`assemble`] then wraps a body with the target-specific prelude
//! (bindings, accessors, `setOutput`, the output coordinate, uniforms)
//! and the compute entry point.

pub mod msl;
pub mod wgsl;

use crate::program::GpuProgram;

/// Entry point name of every assembled kernel.
pub const ENTRY_POINT: &str = "program_kernel";

/// Name of the function each body must define; called once per invocation.
pub const PROGRAM_MAIN: &str = "program_main";

/// Threads per workgroup / threadgroup for assembled kernels.
pub const WORKGROUP_SIZE: u32 = 256;

/// Kernel source languages a program body can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderLang {
    #[default]
    Wgsl,
    Msl,
}

impl ShaderLang {
    pub fn name(self) -> &'static str {
        match self {
            ShaderLang::Wgsl => "wgsl",
            ShaderLang::Msl => "msl",
        }
    }

    /// Syntax emitter for this language.
    pub fn dialect(self) -> &'static dyn KernelDialect {
        match self {
            ShaderLang::Wgsl => &wgsl::Wgsl,
            ShaderLang::Msl => &msl::Msl,
        }
    }
}

/// Syntax of a kernel language, as needed by the program generators.
///
/// Expressions that read the same in every target (`min(a, b)`, `fract`,
/// `cos`, `dot`, `if (..) { .. }`, `return;`, compound assignment) are
/// written directly by the generators.
pub trait KernelDialect: Sync {
    fn lang(&self) -> ShaderLang;

    fn float_ty(&self) -> &'static str;

    fn vec2_ty(&self) -> &'static str;

    /// A float literal in this language's notation.
    fn float_lit(&self, value: f64) -> String;

    /// Constant visible to every function of the body.
    fn const_decl(&self, name: &str, ty: &str, value: &str) -> String;

    /// Mutable local variable declaration statement.
    fn local(&self, name: &str, ty: &str, init: &str) -> String;

    /// Function definition. `ret == None` means no return value.
    fn function(&self, name: &str, params: &[(&str, &str)], ret: Option<&str>, body: &str)
        -> String;

    /// `for` loop over `0..bound` with an `int` counter named `var`.
    fn for_range(&self, var: &str, bound: usize, body: &str) -> String;

    /// NaN test on a float expression.
    fn is_nan(&self, expr: &str) -> String;

    /// Integer to float conversion.
    fn to_float(&self, expr: &str) -> String;

    /// Reference to a declared scalar uniform.
    fn uniform(&self, name: &str) -> String;

    fn vec2(&self, x: &str, y: &str) -> String {
        format!("{}({x}, {y})", self.vec2_ty())
    }
}

/// Indent every non-empty line of `src` by `levels * 4` spaces.
pub fn indent(src: &str, levels: usize) -> String {
    let pad = " ".repeat(levels * 4);
    src.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accessor suffix for an input: `probs` is read through `getProbs`.
pub(crate) fn accessor_name(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Row-major flattening of `get<Name>(i0, .., ik)` arguments.
pub(crate) fn flat_index_expr(shape: &[usize]) -> String {
    if shape.is_empty() {
        return "0".to_string();
    }
    let mut stride = 1usize;
    let mut terms = Vec::with_capacity(shape.len());
    for (axis, dim) in shape.iter().enumerate().rev() {
        if stride == 1 {
            terms.push(format!("i{axis}"));
        } else {
            terms.push(format!("i{axis} * {stride}"));
        }
        stride *= dim;
    }
    terms.reverse();
    terms.join(" + ")
}

/// A body wrapped into a complete, compilable kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledKernel {
    pub source: String,
    pub entry_point: &'static str,
    /// Inputs, then the output buffer, then the uniform block.
    pub num_bindings: usize,
}

/// Wrap a program body into a full kernel for its language.
pub fn assemble(program: &dyn GpuProgram) -> AssembledKernel {
    let source = match program.lang() {
        ShaderLang::Wgsl => wgsl::assemble(program),
        ShaderLang::Msl => msl::assemble(program),
    };
    log::trace!("assembled {} kernel:\n{}", program.lang().name(), source);
    AssembledKernel {
        source,
        entry_point: ENTRY_POINT,
        num_bindings: program.inputs().len() + 2,
    }
}
