use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn write_frames(run_dir: &Path, names: &[&str]) {
    fs::create_dir_all(run_dir).expect("create run dir");
    for name in names {
        fs::write(run_dir.join(name), b"\xff\xd8\xff").expect("write frame");
    }
}

fn write_run1(base: &Path) {
    write_frames(
        &base.join("run1"),
        &["frameRUN3.jpg", "frameRUN1.jpg", "frameRUN2.png", "notes.txt"],
    );
    fs::write(base.join("run1_phases.csv"), "grasp,0,5\nrelease,6,9\n").expect("write phases");
}

fn generate(base: &Path, extra: &[&str]) -> std::process::Output {
    Command::new(assert_cmd::cargo::cargo_bin!("stagemap"))
        .arg("generate")
        .arg(base)
        .args(extra)
        .output()
        .expect("generate runs")
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).expect("read manifest");
    serde_json::from_str(&text).expect("manifest is valid JSON")
}

#[test]
fn help_lists_generate_flags() {
    let output = Command::new(assert_cmd::cargo::cargo_bin!("stagemap"))
        .arg("generate")
        .arg("--help")
        .output()
        .expect("generate --help runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    for flag in ["--output", "--frame-prefix", "--run", "--progress"] {
        assert!(text.contains(flag), "help text missing {flag}: {text}");
    }
}

#[test]
fn generate_writes_sorted_frames_and_stages() {
    let tmp = TempDir::new().expect("tempdir");
    write_run1(tmp.path());

    let output = generate(tmp.path(), &["--progress", "plain"]);
    assert!(output.status.success(), "{}", combined_output(&output));

    let value = read_json(&tmp.path().join("manifest.json"));
    assert_eq!(
        value["run1"],
        serde_json::json!({
            "folder": "run1",
            "frames": ["frameRUN1.jpg", "frameRUN2.png", "frameRUN3.jpg"],
            "stages": [
                {"name": "grasp", "startFrame": 0, "endFrame": 5},
                {"name": "release", "startFrame": 6, "endFrame": 9}
            ]
        })
    );

    let text = combined_output(&output);
    assert!(text.contains("[PROGRESS] manifest"), "missing plain progress: {text}");
    assert!(text.contains("Manifest summary:"), "missing summary: {text}");
    assert!(text.contains("runs=1 frames=3 stages=2"), "wrong counts: {text}");
}

#[test]
fn generate_on_empty_base_writes_empty_object() {
    let tmp = TempDir::new().expect("tempdir");
    let output = generate(tmp.path(), &["--progress", "quiet"]);
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        fs::read_to_string(tmp.path().join("manifest.json")).expect("read manifest"),
        "{}"
    );
}

#[test]
fn generate_twice_is_byte_identical() {
    let tmp = TempDir::new().expect("tempdir");
    write_run1(tmp.path());
    write_frames(&tmp.path().join("AA83-7"), &["D_RUN10.jpeg", "D_RUN9.jpeg", "cover.png"]);

    let path = tmp.path().join("manifest.json");
    assert!(generate(tmp.path(), &["--progress", "quiet"]).status.success());
    let first = fs::read(&path).expect("first manifest");
    assert!(generate(tmp.path(), &["--progress", "quiet"]).status.success());
    assert_eq!(first, fs::read(&path).expect("second manifest"));

    let value = read_json(&path);
    assert_eq!(
        value["AA83-7"]["frames"],
        serde_json::json!(["D_RUN9.jpeg", "D_RUN10.jpeg", "cover.png"])
    );
    assert_eq!(value["AA83-7"]["stages"], serde_json::json!([]));
}

#[test]
fn short_lines_are_skipped_with_a_warning() {
    let tmp = TempDir::new().expect("tempdir");
    write_run1(tmp.path());
    fs::write(tmp.path().join("run1_phases.csv"), "prep,0\nprep,0,10\n").expect("write phases");

    let output = generate(tmp.path(), &["--progress", "plain"]);
    assert!(output.status.success(), "{}", combined_output(&output));

    let value = read_json(&tmp.path().join("manifest.json"));
    assert_eq!(
        value["run1"]["stages"],
        serde_json::json!([{"name": "prep", "startFrame": 0, "endFrame": 10}])
    );
    let text = combined_output(&output);
    assert!(text.contains("[WARN] manifest"), "missing warning: {text}");
    assert!(text.contains("skipped_lines=1"), "missing skipped count: {text}");
}

#[test]
fn bad_stage_number_fails_and_keeps_previous_manifest() {
    let tmp = TempDir::new().expect("tempdir");
    write_run1(tmp.path());
    let path = tmp.path().join("manifest.json");
    fs::write(&path, "{\"previous\": true}").expect("seed manifest");
    fs::write(tmp.path().join("run1_phases.csv"), "grasp,0,five\n").expect("write phases");

    let output = generate(tmp.path(), &["--progress", "quiet"]);
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("run1_phases.csv"), "error should name the file: {text}");
    assert!(text.contains("endFrame"), "error should name the field: {text}");
    assert_eq!(
        fs::read_to_string(&path).expect("read manifest"),
        "{\"previous\": true}"
    );
}

#[test]
fn missing_base_dir_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let missing = tmp.path().join("does-not-exist");
    let output = generate(&missing, &["--progress", "quiet"]);
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("does-not-exist"), "error should name the path: {text}");
}

#[test]
fn frame_prefix_run_filter_and_output_path() {
    let tmp = TempDir::new().expect("tempdir");
    write_run1(tmp.path());
    write_frames(&tmp.path().join("run2"), &["xRUN1.jpg"]);
    let out = tmp.path().join("out").join("viewer.json");
    fs::create_dir_all(out.parent().expect("parent")).expect("mkdir out");

    let output = generate(
        tmp.path(),
        &[
            "--progress",
            "quiet",
            "--run",
            "run1",
            "--frame-prefix",
            "/example",
            "--output",
            out.to_str().expect("utf8 path"),
        ],
    );
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(!tmp.path().join("manifest.json").exists());

    let value = read_json(&out);
    let runs = value.as_object().expect("object");
    assert_eq!(runs.keys().collect::<Vec<_>>(), vec!["run1"]);
    assert_eq!(value["run1"]["frames"][0], "/example/run1/frameRUN1.jpg");
}
