//! Compiles the GLSL triangle shaders to SPIR-V words with naga.
//!
//! Emits `$OUT_DIR/shaders.rs` holding `VERTEX_SPIRV` and `FRAGMENT_SPIRV`.

use std::fmt::Write as _;
use std::path::Path;

fn compile_glsl_to_spirv(path: &Path, stage: naga::ShaderStage) -> Vec<u32> {
    let source = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));

    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(stage), &source)
        .unwrap_or_else(|e| panic!("failed to parse {}: {:?}", path.display(), e));

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .unwrap_or_else(|e| panic!("{} failed validation: {:?}", path.display(), e));

    // The GLSL sources already target Vulkan clip space.
    let options = naga::back::spv::Options {
        lang_version: (1, 0),
        flags: naga::back::spv::WriterFlags::empty(),
        ..Default::default()
    };
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage,
        entry_point: "main".to_string(),
    };

    let mut writer =
        naga::back::spv::Writer::new(&options).expect("failed to create SPIR-V writer");
    let mut words = Vec::new();
    writer
        .write(&module, &info, Some(&pipeline_options), &None, &mut words)
        .unwrap_or_else(|e| panic!("failed to generate SPIR-V for {}: {:?}", path.display(), e));
    words
}

fn emit_words(out: &mut String, name: &str, words: &[u32]) {
    let _ = writeln!(out, "pub const {}: &[u32] = &[", name);
    for chunk in words.chunks(8) {
        out.push_str("   ");
        for word in chunk {
            let _ = write!(out, " {:#010x},", word);
        }
        out.push('\n');
    }
    out.push_str("];\n");
}

fn main() {
    let shader_dir = Path::new("shaders");
    let vert = shader_dir.join("triangle.vert");
    let frag = shader_dir.join("triangle.frag");
    println!("cargo:rerun-if-changed={}", vert.display());
    println!("cargo:rerun-if-changed={}", frag.display());

    let mut out = String::new();
    emit_words(
        &mut out,
        "VERTEX_SPIRV",
        &compile_glsl_to_spirv(&vert, naga::ShaderStage::Vertex),
    );
    emit_words(
        &mut out,
        "FRAGMENT_SPIRV",
        &compile_glsl_to_spirv(&frag, naga::ShaderStage::Fragment),
    );

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    std::fs::write(Path::new(&out_dir).join("shaders.rs"), out)
        .expect("failed to write generated shaders");
}
