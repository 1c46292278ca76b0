//! End-to-end tests for the preprocessing run over real temp directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use yamlpp::{check, run, PreprocessError};

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Read every file under `root` into a relative-path -> contents map.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
            files.insert(rel, fs::read(entry.path()).unwrap());
        }
    }
    files
}

#[test]
fn greet_scenario_produces_expected_output() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    // Dot-prefixed: a snippet, not an independent output target.
    write(input.path(), ".greet.yaml", "msg: Hello ${name}\n");
    write(
        input.path(),
        "main.yaml",
        "content: !include\n  file: .greet.yaml\n  vars:\n    name: World\n",
    );

    let report = run(input.path(), output.path()).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);

    let main_out = fs::read_to_string(output.path().join("main.yaml")).unwrap();
    assert!(main_out.contains("msg: Hello World"), "{main_out}");
    // Generated files carry the auto-generated banner.
    assert!(main_out.starts_with("# WARNING"), "{main_out}");
    // No directive node and no placeholder survives to the output.
    assert!(!main_out.contains("!include"), "{main_out}");
    assert!(!main_out.contains("${"), "{main_out}");
}

#[test]
fn running_twice_is_byte_identical() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), ".parts/item.yaml", "label: ${label}\n");
    write(
        input.path(),
        "main.yaml",
        "one: !include\n  file: .parts/item.yaml\n  vars: {label: first}\ntwo: !include\n  file: .parts/item.yaml\n  vars: {label: second}\n",
    );

    assert!(run(input.path(), output.path()).unwrap().is_success());
    let first = snapshot(output.path());
    assert!(run(input.path(), output.path()).unwrap().is_success());
    let second = snapshot(output.path());
    assert_eq!(first, second);
}

#[test]
fn include_cycle_fails_without_stopping_the_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "a.yaml", "b: !include b.yaml\n");
    write(input.path(), "b.yaml", "a: !include a.yaml\n");
    write(input.path(), "fine.yaml", "ok: true\n");

    let report = run(input.path(), output.path()).unwrap();
    assert!(!report.is_success());
    // Both entry points of the cycle fail; the healthy file still lands.
    assert_eq!(report.failed(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, PreprocessError::CircularInclusion { .. })));
    assert!(output.path().join("fine.yaml").exists());
    assert!(!output.path().join("a.yaml").exists());
}

#[test]
fn bindings_are_scoped_to_a_single_include_hop() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "c.yaml", "y_val: ${y}\n");
    write(
        input.path(),
        "b.yaml",
        "x_val: ${x}\nnested: !include\n  file: c.yaml\n  vars: {y: 2}\n",
    );
    write(
        input.path(),
        "main.yaml",
        "top: !include\n  file: b.yaml\n  vars: {x: 1}\n",
    );

    let report = run(input.path(), output.path()).unwrap();
    // b.yaml and c.yaml are also top-level documents here, and their bare
    // placeholders make them fail on their own; main.yaml must still work.
    let main_out = fs::read_to_string(output.path().join("main.yaml")).unwrap();
    assert!(main_out.contains("x_val: '1'"), "{main_out}");
    assert!(main_out.contains("y_val: '2'"), "{main_out}");
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed(), 2);
}

#[test]
fn private_files_are_include_targets_but_not_output() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), ".snippet.yaml", "from_snippet: ${v}\n");
    write(input.path(), ".partials/deep.yaml", "deep: yes\n");
    write(
        input.path(),
        "main.yaml",
        "snip: !include\n  file: .snippet.yaml\n  vars: {v: ok}\ndeep: !include .partials/deep.yaml\n",
    );

    let report = run(input.path(), output.path()).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.processed, 1);
    assert!(!output.path().join(".snippet.yaml").exists());
    assert!(!output.path().join(".partials").exists());
    let main_out = fs::read_to_string(output.path().join("main.yaml")).unwrap();
    assert!(main_out.contains("from_snippet: ok"), "{main_out}");
}

#[test]
fn stale_output_files_do_not_survive_a_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "real.yaml", "a: 1\n");
    write(output.path(), "stale.yaml", "should: vanish\n");
    write(output.path(), "nested/stale.txt", "gone too\n");

    assert!(run(input.path(), output.path()).unwrap().is_success());
    assert!(!output.path().join("stale.yaml").exists());
    assert!(!output.path().join("nested").exists());
    assert!(output.path().join("real.yaml").exists());
}

#[test]
fn top_level_placeholders_are_always_unbound() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "a.yaml", "name: ${who}\n");
    write(input.path(), "b.yaml", "fine: yes\n");

    let report = run(input.path(), output.path()).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failed(), 1);
    match &report.failures[0].error {
        PreprocessError::UnresolvedVariable { name, .. } => assert_eq!(name, "who"),
        other => panic!("expected UnresolvedVariable, got {other}"),
    }
    assert_eq!(report.failures[0].path, PathBuf::from("a.yaml"));
    // The healthy sibling is still written.
    assert!(output.path().join("b.yaml").exists());
}

#[test]
fn non_yaml_files_are_copied_through_unchanged() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "doc.yaml", "a: 1\n");
    write(input.path(), "assets/data.json", "{\"raw\": true}");
    write(input.path(), "notes.txt", "not yaml at all ${nope}\n");

    let report = run(input.path(), output.path()).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.copied, 2);
    // Copied files are untouched: no banner, no substitution.
    let json = fs::read_to_string(output.path().join("assets/data.json")).unwrap();
    assert_eq!(json, "{\"raw\": true}");
    let txt = fs::read_to_string(output.path().join("notes.txt")).unwrap();
    assert!(txt.contains("${nope}"));
}

#[test]
fn output_root_gets_a_regeneration_readme() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "doc.yaml", "a: 1\n");

    run(input.path(), output.path()).unwrap();
    let readme = fs::read_to_string(output.path().join("README.md")).unwrap();
    assert!(readme.contains("wiped and regenerated"));
}

#[test]
fn nested_directories_are_mirrored() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "sub/dir/leaf.yaml", "leaf: true\n");

    assert!(run(input.path(), output.path()).unwrap().is_success());
    assert!(output.path().join("sub/dir/leaf.yaml").exists());
}

#[test]
fn parse_errors_are_file_scoped() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "broken.yaml", "key: [unclosed\n");
    write(input.path(), "good.yaml", "fine: yes\n");

    let report = run(input.path(), output.path()).unwrap();
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.failures[0].error,
        PreprocessError::YamlParse { .. }
    ));
    assert!(output.path().join("good.yaml").exists());
}

#[test]
fn missing_include_target_is_reported_with_context() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "main.yaml", "gone: !include missing.yaml\n");

    let report = run(input.path(), output.path()).unwrap();
    assert_eq!(report.failed(), 1);
    let msg = report.failures[0].error.to_string();
    assert!(msg.contains("missing.yaml"), "{msg}");
    assert!(msg.contains("main.yaml"), "{msg}");
}

#[test]
fn check_resolves_without_writing() {
    let input = TempDir::new().unwrap();
    write(input.path(), "greet.yaml", "msg: Hello ${name}\n");
    write(
        input.path(),
        "main.yaml",
        "content: !include\n  file: greet.yaml\n  vars: {name: World}\n",
    );

    let before = snapshot(input.path());
    let report = check(input.path()).unwrap();
    // greet.yaml fails standalone (bare placeholder), main.yaml resolves.
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed(), 1);
    // Nothing on disk changed.
    assert_eq!(before, snapshot(input.path()));
}

#[test]
fn unknown_tags_round_trip_to_the_output() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(
        input.path(),
        "config.yaml",
        "api_key: !secret my_key\nautomations: !include_dir_list automations/\n",
    );

    let report = run(input.path(), output.path()).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    let out = fs::read_to_string(output.path().join("config.yaml")).unwrap();
    assert!(out.contains("!secret my_key"), "{out}");
    assert!(out.contains("!include_dir_list"), "{out}");
}
