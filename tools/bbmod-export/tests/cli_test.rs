//! End-to-end tests of the bbmod-export binary

mod gltf_generator;

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn bbmod_export(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bbmod-export"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run bbmod-export")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("Non UTF-8 temp path")
}

#[test]
fn test_convert_and_inspect() {
    let dir = tempdir().unwrap();
    let input = gltf_generator::write_glb(
        dir.path(),
        "Character.glb",
        &gltf_generator::generate_skinned_glb(),
    );

    // Output defaults to the input path with the model extension
    let output = bbmod_export(&["convert", path_str(&input), "--sampling-rate", "10"]);
    assert!(output.status.success(), "convert failed: {output:?}");

    let model = dir.path().join("Character.bbmod");
    let animation = dir.path().join("Character_Wave.bbanim");
    assert!(model.exists());
    assert!(animation.exists());

    let info = bbmod_export(&["info", path_str(&model)]);
    assert!(info.status.success());
    let stdout = String::from_utf8_lossy(&info.stdout);
    assert!(stdout.contains("bones: 2"), "{stdout}");
    assert!(stdout.contains("Arm [bone]"), "{stdout}");

    let info = bbmod_export(&["info", path_str(&animation)]);
    assert!(info.status.success());
    let stdout = String::from_utf8_lossy(&info.stdout);
    assert!(stdout.contains("10 frames at 10 fps"), "{stdout}");
}

#[test]
fn test_convert_to_explicit_output() {
    let dir = tempdir().unwrap();
    let input = gltf_generator::write_glb(
        dir.path(),
        "quad.glb",
        &gltf_generator::generate_static_glb(),
    );
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let model = out_dir.join("Floor.bbmod");

    let output = bbmod_export(&[
        "convert",
        path_str(&input),
        "-o",
        path_str(&model),
        "--gen-normals",
        "flat",
        "--right-handed",
    ]);
    assert!(output.status.success(), "convert failed: {output:?}");
    assert!(model.exists());
}

#[test]
fn test_missing_input_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.glb");

    let output = bbmod_export(&["convert", path_str(&input)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("missing.bbmod").exists());
}

#[test]
fn test_unsupported_extension_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("scene.fbx");
    std::fs::write(&input, b"not a scene").unwrap();

    let output = bbmod_export(&["convert", path_str(&input)]);
    assert!(!output.status.success());
}

#[test]
fn test_batch_reports_failures() {
    let dir = tempdir().unwrap();
    gltf_generator::write_glb(
        dir.path(),
        "a.glb",
        &gltf_generator::generate_static_glb(),
    );
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    gltf_generator::write_glb(&nested, "b.glb", &gltf_generator::generate_skinned_glb());

    let output = bbmod_export(&["batch", path_str(dir.path())]);
    assert!(output.status.success(), "batch failed: {output:?}");
    assert!(dir.path().join("a.bbmod").exists());
    assert!(nested.join("b.bbmod").exists());
    assert!(nested.join("b_Wave.bbanim").exists());

    std::fs::write(dir.path().join("broken.gltf"), b"{").unwrap();
    let output = bbmod_export(&["batch", path_str(dir.path())]);
    assert!(!output.status.success());
}

#[test]
fn test_info_rejects_unknown_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let output = bbmod_export(&["info", path_str(&path)]);
    assert!(!output.status.success());
}
