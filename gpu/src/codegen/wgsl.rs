//! WebGPU Shading Language (WGSL) code generation.
//!
//! Every program is assembled into one compute shader with bindings at
//! `@group(0) @binding(N)`: inputs first (`input_<Name>`), then the
//! `result` buffer, then the `ProgramUniforms` block. Per-invocation state
//! (`out_index`, `resultUV`) lives in `var<private>` globals so the body's
//! functions can reach it without extra parameters.

use super::{
    accessor_name, flat_index_expr, indent, KernelDialect, ShaderLang, ENTRY_POINT, PROGRAM_MAIN,
    WORKGROUP_SIZE,
};
use crate::program::GpuProgram;

/// WGSL syntax for program generators.
pub struct Wgsl;

impl KernelDialect for Wgsl {
    fn lang(&self) -> ShaderLang {
        ShaderLang::Wgsl
    }

    fn float_ty(&self) -> &'static str {
        "f32"
    }

    fn vec2_ty(&self) -> &'static str {
        "vec2<f32>"
    }

    fn float_lit(&self, value: f64) -> String {
        format!("{value:?}")
    }

    fn const_decl(&self, name: &str, ty: &str, value: &str) -> String {
        format!("const {name}: {ty} = {value};")
    }

    fn local(&self, name: &str, ty: &str, init: &str) -> String {
        format!("var {name}: {ty} = {init};")
    }

    fn function(
        &self,
        name: &str,
        params: &[(&str, &str)],
        ret: Option<&str>,
        body: &str,
    ) -> String {
        let params: Vec<String> = params.iter().map(|(n, t)| format!("{n}: {t}")).collect();
        let ret = ret.map(|t| format!(" -> {t}")).unwrap_or_default();
        format!(
            "fn {name}({}){ret} {{\n{}\n}}",
            params.join(", "),
            indent(body, 1)
        )
    }

    fn for_range(&self, var: &str, bound: usize, body: &str) -> String {
        format!(
            "for (var {var}: i32 = 0; {var} < {bound}; {var}++) {{\n{}\n}}",
            indent(body, 1)
        )
    }

    fn is_nan(&self, expr: &str) -> String {
        format!("isNaN({expr})")
    }

    fn to_float(&self, expr: &str) -> String {
        format!("f32({expr})")
    }

    fn uniform(&self, name: &str) -> String {
        format!("uniforms.{name}")
    }
}

/// WGSL has no NaN builtin and may fold `v != v`; test the bit pattern.
const NAN_HELPER: &str = r#"fn isNaN(v: f32) -> bool {
    return (bitcast<u32>(v) & 0x7fffffffu) > 0x7f800000u;
}"#;

fn uniform_struct(program: &dyn GpuProgram) -> String {
    let mut fields = vec!["    numel: u32,".to_string()];
    for decl in program.uniforms() {
        fields.push(format!("    {}: f32,", decl.name));
    }
    let used = fields.len();
    for pad in 0..(used.div_ceil(4) * 4 - used) {
        fields.push(format!("    _pad{pad}: u32,"));
    }
    format!("struct ProgramUniforms {{\n{}\n}}", fields.join("\n"))
}

fn accessors(program: &dyn GpuProgram) -> String {
    let mut out = Vec::new();
    for binding in program.inputs() {
        let name = binding.name;
        let getter = accessor_name(name);
        out.push(format!(
            "fn get{getter}Flat(i: i32) -> f32 {{\n    return input_{name}[i];\n}}"
        ));
        let params: Vec<String> = (0..binding.shape.len())
            .map(|axis| format!("i{axis}: i32"))
            .collect();
        out.push(format!(
            "fn get{getter}({}) -> f32 {{\n    return input_{name}[{}];\n}}",
            params.join(", "),
            flat_index_expr(&binding.shape)
        ));
    }
    out.push("fn setOutput(v: f32) {\n    result[out_index] = v;\n}".to_string());
    out.join("\n\n")
}

/// Generate the complete WGSL shader for a program.
pub fn assemble(program: &dyn GpuProgram) -> String {
    let inputs = program.inputs();
    let mut bindings: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(i, b)| {
            format!(
                "@group(0) @binding({i}) var<storage, read> input_{}: array<f32>;",
                b.name
            )
        })
        .collect();
    let result_binding = inputs.len();
    bindings.push(format!(
        "@group(0) @binding({result_binding}) var<storage, read_write> result: array<f32>;"
    ));

    format!(
        r#"{bindings}

{uniforms}
@group(0) @binding({uniform_binding}) var<uniform> uniforms: ProgramUniforms;

var<private> out_index: u32;
var<private> resultUV: vec2<f32>;

{NAN_HELPER}

{accessors}

{body}

@compute @workgroup_size({WORKGROUP_SIZE})
fn {ENTRY_POINT}(@builtin(global_invocation_id) gid: vec3<u32>) {{
    if (gid.x >= uniforms.numel) {{
        return;
    }}
    out_index = gid.x;
    resultUV = vec2<f32>((f32(gid.x) + 0.5) / f32(uniforms.numel), 0.5);
    {PROGRAM_MAIN}();
}}
"#,
        bindings = bindings.join("\n"),
        uniforms = uniform_struct(program),
        uniform_binding = result_binding + 1,
        accessors = accessors(program),
        body = program.body(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minmax::{MinMaxProgram, ReduceOp};
    use crate::multinomial::MultinomialProgram;

    #[test]
    fn test_dialect_statements() {
        let d = Wgsl;
        assert_eq!(d.local("x", "f32", "1.0"), "var x: f32 = 1.0;");
        assert_eq!(d.const_decl("K", "f32", "2.0"), "const K: f32 = 2.0;");
        assert_eq!(d.float_lit(12345.6789), "12345.6789");
        assert_eq!(d.float_lit(0.0), "0.0");
        assert_eq!(d.to_float("i"), "f32(i)");
        assert_eq!(d.vec2("a", "b"), "vec2<f32>(a, b)");
        assert_eq!(
            d.function("f", &[("a", "f32")], Some("f32"), "return a;"),
            "fn f(a: f32) -> f32 {\n    return a;\n}"
        );
        assert_eq!(
            d.for_range("i", 3, "x += 1.0;"),
            "for (var i: i32 = 0; i < 3; i++) {\n    x += 1.0;\n}"
        );
    }

    #[test]
    fn test_assemble_minmax() {
        let program = MinMaxProgram::new(5, ReduceOp::Max).unwrap();
        let src = assemble(&program);
        assert!(src.contains("@group(0) @binding(0) var<storage, read> input_A: array<f32>;"));
        assert!(src.contains("@group(0) @binding(1) var<storage, read_write> result: array<f32>;"));
        assert!(src.contains("@group(0) @binding(2) var<uniform> uniforms: ProgramUniforms;"));
        assert!(src.contains("fn getAFlat(i: i32) -> f32"));
        assert!(src.contains("fn getA(i0: i32) -> f32"));
        assert!(src.contains("fn setOutput(v: f32)"));
        assert!(src.contains("@compute @workgroup_size(256)"));
        assert!(src.contains("fn program_kernel("));
        assert!(src.contains("    program_main();"));
        assert!(src.contains("_pad2: u32,"));
    }

    #[test]
    fn test_assemble_multinomial_declares_seed() {
        let program = MultinomialProgram::new(4, 10).unwrap();
        let src = assemble(&program);
        assert!(src.contains("input_probs: array<f32>"));
        assert!(src.contains("    numel: u32,\n    seed: f32,\n    _pad0: u32,\n    _pad1: u32,"));
        assert!(src.contains("fn getProbs(i0: i32) -> f32"));
        assert!(src.contains("random(uniforms.seed)"));
    }

    #[test]
    fn test_uniform_struct_padding() {
        let program = MinMaxProgram::new(1, ReduceOp::Min).unwrap();
        let s = uniform_struct(&program);
        assert_eq!(s.matches("_pad").count(), 3);
    }
}
