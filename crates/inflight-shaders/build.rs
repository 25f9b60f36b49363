//! Build script to compile GLSL shaders to SPIR-V.

use shaderc::{Compiler, ShaderKind};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SHADERS: &[(&str, &str, ShaderKind)] = &[
    ("texture.comp", "texture_comp.spv", ShaderKind::Compute),
    ("toy.vert", "toy_vert.spv", ShaderKind::Vertex),
    ("toy.frag", "toy_frag.spv", ShaderKind::Fragment),
];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let shader_dir = Path::new("shaders");

    println!("cargo:rerun-if-changed=shaders/");

    let compiler = Compiler::new().expect("Failed to create shader compiler");

    for (source, output, kind) in SHADERS {
        compile_shader(
            &compiler,
            &shader_dir.join(source),
            &out_dir.join(output),
            *kind,
        );
    }
}

fn compile_shader(compiler: &Compiler, input_path: &Path, output_path: &Path, kind: ShaderKind) {
    let source = fs::read_to_string(input_path)
        .unwrap_or_else(|e| panic!("Failed to read shader {input_path:?}: {e}"));

    let file_name = input_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("shader");

    let mut options = shaderc::CompileOptions::new().expect("Failed to create compile options");
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_3 as u32,
    );
    options.set_target_spirv(shaderc::SpirvVersion::V1_6);
    options.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let result = compiler
        .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
        .unwrap_or_else(|e| panic!("Failed to compile shader {input_path:?}: {e}"));

    if result.get_num_warnings() > 0 {
        println!(
            "cargo:warning=Shader warnings in {input_path:?}: {}",
            result.get_warning_messages()
        );
    }

    fs::write(
        output_path,
        bytemuck::cast_slice::<u32, u8>(result.as_binary()),
    )
    .unwrap_or_else(|e| panic!("Failed to write shader {output_path:?}: {e}"));
}
