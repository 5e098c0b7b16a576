//! Metal Shading Language (MSL) code generation.
//!
//! MSL has no mutable program-scope variables, so the body is placed inside
//! a `Program` struct whose members hold the bound buffers and the
//! per-invocation state. Accessors and body functions become member
//! functions; the kernel fills one `Program` per thread and calls
//! `program_main()` on it:
//!
//! ```metal
//! kernel void program_kernel(
//!     device const float* input_A [[buffer(0)]],
//!     device float* result [[buffer(1)]],
//!     constant ProgramUniforms& uniforms [[buffer(2)]],
//!     uint gid [[thread_position_in_grid]]
//! ) {
//!     Program program;
//!     ...
//!     program.program_main();
//! }
//! ```

use super::{
    accessor_name, flat_index_expr, indent, KernelDialect, ShaderLang, ENTRY_POINT, PROGRAM_MAIN,
};
use crate::program::GpuProgram;

/// MSL syntax for program generators.
pub struct Msl;

impl KernelDialect for Msl {
    fn lang(&self) -> ShaderLang {
        ShaderLang::Msl
    }

    fn float_ty(&self) -> &'static str {
        "float"
    }

    fn vec2_ty(&self) -> &'static str {
        "float2"
    }

    fn float_lit(&self, value: f64) -> String {
        format!("{value:?}f")
    }

    fn const_decl(&self, name: &str, ty: &str, value: &str) -> String {
        format!("const {ty} {name} = {value};")
    }

    fn local(&self, name: &str, ty: &str, init: &str) -> String {
        format!("{ty} {name} = {init};")
    }

    fn function(
        &self,
        name: &str,
        params: &[(&str, &str)],
        ret: Option<&str>,
        body: &str,
    ) -> String {
        let params: Vec<String> = params.iter().map(|(n, t)| format!("{t} {n}")).collect();
        format!(
            "{} {name}({}) {{\n{}\n}}",
            ret.unwrap_or("void"),
            params.join(", "),
            indent(body, 1)
        )
    }

    fn for_range(&self, var: &str, bound: usize, body: &str) -> String {
        format!(
            "for (int {var} = 0; {var} < {bound}; {var}++) {{\n{}\n}}",
            indent(body, 1)
        )
    }

    fn is_nan(&self, expr: &str) -> String {
        format!("isnan({expr})")
    }

    fn to_float(&self, expr: &str) -> String {
        format!("float({expr})")
    }

    fn uniform(&self, name: &str) -> String {
        format!("uniforms->{name}")
    }
}

fn uniform_struct(program: &dyn GpuProgram) -> String {
    let mut fields = vec!["    uint numel;".to_string()];
    for decl in program.uniforms() {
        fields.push(format!("    float {};", decl.name));
    }
    let used = fields.len();
    for pad in 0..(used.div_ceil(4) * 4 - used) {
        fields.push(format!("    uint _pad{pad};"));
    }
    format!("struct ProgramUniforms {{\n{}\n}};", fields.join("\n"))
}

fn members(program: &dyn GpuProgram) -> String {
    let mut out: Vec<String> = program
        .inputs()
        .iter()
        .map(|b| format!("device const float* input_{};", b.name))
        .collect();
    out.push("device float* result;".to_string());
    out.push("constant ProgramUniforms* uniforms;".to_string());
    out.push("uint out_index;".to_string());
    out.push("float2 resultUV;".to_string());
    out.join("\n")
}

fn accessors(program: &dyn GpuProgram) -> String {
    let mut out = Vec::new();
    for binding in program.inputs() {
        let name = binding.name;
        let getter = accessor_name(name);
        out.push(format!(
            "float get{getter}Flat(int i) {{\n    return input_{name}[i];\n}}"
        ));
        let params: Vec<String> = (0..binding.shape.len())
            .map(|axis| format!("int i{axis}"))
            .collect();
        out.push(format!(
            "float get{getter}({}) {{\n    return input_{name}[{}];\n}}",
            params.join(", "),
            flat_index_expr(&binding.shape)
        ));
    }
    out.push("void setOutput(float v) {\n    result[out_index] = v;\n}".to_string());
    out.join("\n\n")
}

/// Generate the complete MSL source for a program.
pub fn assemble(program: &dyn GpuProgram) -> String {
    let inputs = program.inputs();
    let mut params: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(i, b)| format!("    device const float* input_{} [[buffer({i})]],", b.name))
        .collect();
    let result_index = inputs.len();
    params.push(format!("    device float* result [[buffer({result_index})]],"));
    params.push(format!(
        "    constant ProgramUniforms& uniforms [[buffer({})]],",
        result_index + 1
    ));
    params.push("    uint gid [[thread_position_in_grid]]".to_string());

    let mut wiring: Vec<String> = inputs
        .iter()
        .map(|b| format!("    program.input_{0} = input_{0};", b.name))
        .collect();
    wiring.push("    program.result = result;".to_string());
    wiring.push("    program.uniforms = &uniforms;".to_string());

    format!(
        r#"#include <metal_stdlib>
using namespace metal;

{uniforms}

struct Program {{
{members}

{accessors}

{body}
}};

kernel void {ENTRY_POINT}(
{params}
) {{
    if (gid >= uniforms.numel) {{
        return;
    }}
    Program program;
{wiring}
    program.out_index = gid;
    program.resultUV = float2((float(gid) + 0.5f) / float(uniforms.numel), 0.5f);
    program.{PROGRAM_MAIN}();
}}
"#,
        uniforms = uniform_struct(program),
        members = indent(&members(program), 1),
        accessors = indent(&accessors(program), 1),
        body = indent(program.body(), 1),
        params = params.join("\n"),
        wiring = wiring.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ShaderLang;
    use crate::minmax::{MinMaxProgram, ReduceOp};
    use crate::multinomial::MultinomialProgram;

    #[test]
    fn test_dialect_statements() {
        let d = Msl;
        assert_eq!(d.local("x", "float", "1.0f"), "float x = 1.0f;");
        assert_eq!(d.float_lit(0.5), "0.5f");
        assert_eq!(d.is_nan("x"), "isnan(x)");
        assert_eq!(d.uniform("seed"), "uniforms->seed");
        assert_eq!(
            d.function("program_main", &[], None, "return;"),
            "void program_main() {\n    return;\n}"
        );
    }

    #[test]
    fn test_assemble_minmax() {
        let program = MinMaxProgram::with_lang(3, ReduceOp::Min, ShaderLang::Msl).unwrap();
        let src = assemble(&program);
        assert!(src.starts_with("#include <metal_stdlib>"));
        assert!(src.contains("device const float* input_A [[buffer(0)]],"));
        assert!(src.contains("device float* result [[buffer(1)]],"));
        assert!(src.contains("constant ProgramUniforms& uniforms [[buffer(2)]],"));
        assert!(src.contains("    float getAFlat(int i) {"));
        assert!(src.contains("    program.input_A = input_A;"));
        assert!(src.contains("kernel void program_kernel("));
        assert!(src.contains("isnan(candidate)"));
    }

    #[test]
    fn test_assemble_multinomial() {
        let program = MultinomialProgram::with_lang(3, 2, ShaderLang::Msl).unwrap();
        let src = assemble(&program);
        assert!(src.contains("    float seed;"));
        assert!(src.contains("const float2 K1 = float2(23.14069263277926f, 2.665144142690225f);"));
        assert!(src.contains("random(uniforms->seed)"));
        assert!(src.contains("float getProbs(int i0)"));
    }
}
