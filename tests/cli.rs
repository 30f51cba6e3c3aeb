use assert_cmd::prelude::*;
use predicates::str::contains;
use std::path::PathBuf;
use std::process::Command;

fn write_quad_model(dir: &std::path::Path) -> PathBuf {
    let obj = "\
mtllib quad.mtl
o Quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl painted
f 1 2 3
f 1 3 4
";
    let mtl = "newmtl painted\nmap_Kd quad_diffuse.png\n";
    std::fs::write(dir.join("quad.mtl"), mtl).expect("write mtl");
    let path = dir.join("quad.obj");
    std::fs::write(&path, obj).expect("write obj");
    path
}

#[test]
fn cli_info_prints_model_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_quad_model(dir.path());

    let mut cmd = Command::cargo_bin("objview").expect("binary exists");
    cmd.arg(&model).arg("--info");
    cmd.assert()
        .success()
        .stdout(contains(
            "Loaded quad with 1 meshes (4 vertices, 2 triangles, 1 materials)",
        ))
        .stdout(contains(" - Quad (2 triangles)"));
}

#[test]
fn cli_rejects_unknown_arguments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_quad_model(dir.path());

    let mut cmd = Command::cargo_bin("objview").expect("binary exists");
    cmd.arg(&model).arg("--frames");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frames"));
}

#[test]
fn cli_reports_missing_model() {
    let mut cmd = Command::cargo_bin("objview").expect("binary exists");
    cmd.arg("no-such-model.obj").arg("--info");
    cmd.assert()
        .failure()
        .stderr(contains("failed to load model"));
}
