use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn skill(root: &Path, dir: &str, id: &str, extra: &str) {
    write(
        root,
        &format!("skills/{dir}/SKILL.md"),
        &format!("---\nid: {id}\nname: {id}\ndescription: {id} patterns\n{extra}---\nBody of {id}.\n"),
    );
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    skill(root, "frontend/react", "react-framework", "category: frontend/framework\n");
    skill(root, "frontend/vue", "vue-framework", "");
    skill(root, "state/zustand", "zustand@acme", "standalone: true\n");

    write(
        root,
        "relationships.yaml",
        r#"
aliases:
  react: react-framework
  vue: vue-framework
rules:
  - kind: conflict
    subjects: [react]
    targets: [vue]
  - kind: alternative
    subjects: [react]
    targets: [vue]
"#,
    );
    write(
        root,
        "agents.yaml",
        r#"
agents:
  frontend-developer:
    title: Frontend Developer
    description: Builds UI
    tools: [Read, Write]
    sections:
      - name: output-format
        body: Reply in markdown.
"#,
    );
    write(
        root,
        "stacks/production.yaml",
        r#"
agents:
  frontend-developer:
    skills: [react, zustand@acme]
"#,
    );
    write(
        root,
        "stacks/broken.yaml",
        r#"
agents:
  frontend-developer:
    skills: [react, vue]
"#,
    );
    tmp
}

fn cmd(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.env_remove("WEAVE_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .arg("--project")
        .arg(project);
    cmd
}

fn json_stdout(cmd: &mut Command, code: i32) -> Value {
    let out = cmd.arg("--json").assert().code(code).get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn compile_writes_documents_and_report() {
    let tmp = fixture();
    cmd(tmp.path())
        .args(["compile", "production"])
        .assert()
        .success()
        .stdout(contains("frontend-developer"));

    let document = fs::read_to_string(tmp.path().join("dist/production/frontend-developer.md")).unwrap();
    assert!(document.starts_with("---\nname: frontend-developer\n"));
    assert!(document.contains("<skill id=\"react-framework\">"));
    assert!(tmp.path().join("dist/production/report.json").is_file());
    assert!(tmp.path().join("dist/production/skills/acme-zustand/SKILL.md").is_file());
}

#[test]
fn compile_out_flag_overrides_output_dir() {
    let tmp = fixture();
    cmd(tmp.path())
        .args(["--quiet", "compile", "production", "--out"])
        .arg(tmp.path().join("elsewhere"))
        .assert()
        .success();
    assert!(tmp.path().join("elsewhere/production/frontend-developer.md").is_file());
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn conflict_rejects_with_exit_one() {
    let tmp = fixture();
    let report = json_stdout(cmd(tmp.path()).args(["compile", "broken"]), 1);

    let consumer = &report["consumers"][0];
    assert_eq!(consumer["status"], "Rejected");
    assert_eq!(consumer["diagnostics"][0]["code"], "ConflictError");
    assert_eq!(
        consumer["diagnostics"][0]["summary"],
        "ConflictError(react, vue)"
    );
    assert!(!tmp.path().join("dist/broken/frontend-developer.md").exists());
}

#[test]
fn duplicate_id_is_fatal() {
    let tmp = fixture();
    skill(tmp.path(), "legacy/react", "react-framework", "");
    cmd(tmp.path())
        .args(["compile", "production"])
        .assert()
        .code(2)
        .stderr(contains("react-framework"));
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn missing_stack_is_fatal() {
    let tmp = fixture();
    cmd(tmp.path())
        .args(["compile", "staging"])
        .assert()
        .code(2)
        .stderr(contains("staging"));
}

#[test]
fn check_with_stack_writes_nothing() {
    let tmp = fixture();
    cmd(tmp.path()).args(["check", "production"]).assert().success();
    cmd(tmp.path()).args(["check", "broken"]).assert().code(1);
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn check_summarizes_project() {
    let tmp = fixture();
    let summary = json_stdout(cmd(tmp.path()).arg("check"), 0);
    assert_eq!(summary["fragments"], 3);
    assert_eq!(summary["consumers"], 1);
    assert_eq!(summary["stacks"], serde_json::json!(["broken", "production"]));
}

#[test]
fn resolve_alias_reports_canonical_id() {
    let tmp = fixture();
    let trace = json_stdout(cmd(tmp.path()).args(["resolve", "react"]), 0);
    assert_eq!(trace["canonical_id"], "react-framework");
    assert_eq!(trace["reverse_alias"], "react");
    assert_eq!(trace["alternatives"], serde_json::json!(["vue"]));
}

#[test]
fn resolve_unknown_reference_fails() {
    let tmp = fixture();
    cmd(tmp.path())
        .args(["resolve", "svelte"])
        .assert()
        .code(1)
        .stderr(contains("svelte"));
}

#[test]
fn list_json_includes_aliases() {
    let tmp = fixture();
    let entries = json_stdout(cmd(tmp.path()).arg("list"), 0);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    let react = entries
        .iter()
        .find(|e| e["id"] == "react-framework")
        .unwrap();
    assert_eq!(react["aliases"], serde_json::json!(["react"]));
    assert_eq!(react["location"], "frontend/react/SKILL.md");
}

#[test]
fn completions_need_no_project() {
    Command::cargo_bin("weave")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(contains("weave"));
}
