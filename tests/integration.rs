use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn tagr_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tagr");
    path
}

const CATALOG: &str = r#"{
  "plants": [
    {"name": "North", "tags": [
      {"path": "North.Kiln6.Section15.ShellTemp", "description": "Kiln 6 shell temperature section 15", "unit": "degC", "plant": "North", "equipment": "Kiln6"},
      {"path": "North.RawMill.Drive.Current", "description": "Raw mill main drive current", "unit": "A", "plant": "North", "equipment": "RawMill"},
      {"path": "North.Cooler.Fan1.Speed", "description": "Clinker cooler fan speed", "unit": "rpm", "plant": "North", "equipment": "Cooler"},
      {"path": "North.Cooler.Fan2.Speed", "description": "Clinker cooler fan speed", "unit": "rpm", "plant": "North", "equipment": "Cooler"}
    ]}
  ]
}"#;

fn write_config(root: &Path, catalog: &str, extra: &str) -> PathBuf {
    let config_content = format!(
        r#"[catalog]
path = "{root}/data/{catalog}"

[vectors]
path = "{root}/data/vectors.json"
dimension = 256
seed = 11

[cache]
dir = "{root}/cache"
{extra}
"#,
        root = root.display(),
        catalog = catalog,
        extra = extra,
    );
    let config_path = root.join("config").join("tagr.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data").join("catalog.json"), CATALOG).unwrap();

    let config_path = write_config(&root, "catalog.json", "");
    (tmp, config_path)
}

fn run_tagr(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tagr_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("TAGR_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tagr binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn resolve_json(config_path: &Path, description: &str, extra: &[&str]) -> serde_json::Value {
    let mut args = vec!["resolve", description, "--json"];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_tagr(config_path, &args);
    assert!(success, "resolve failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("resolve output is not JSON ({}): {}", e, stdout))
}

#[test]
fn test_keywords_drops_stop_words() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_tagr(
        &config_path,
        &["keywords", "Show me the average kiln 6 shell temperature"],
    );
    assert!(success);
    assert_eq!(stdout.trim(), "kiln 6 shell temperature");
}

#[test]
fn test_resolve_confident_match() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_tagr(&config_path, &["resolve", "kiln 6 shell temperature"]);
    assert!(success, "resolve failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        stdout.lines().next(),
        Some("North.Kiln6.Section15.ShellTemp")
    );
}

#[test]
fn test_resolve_json_contract() {
    let (_tmp, config_path) = setup_test_env();
    let resp = resolve_json(&config_path, "kiln 6 shell temperature", &[]);

    assert_eq!(resp["success"], true);
    assert_eq!(resp["most_likely_path"], "North.Kiln6.Section15.ShellTemp");
    assert_eq!(resp["confidence_label"], "high");
    assert_eq!(resp["next_step"], "return_path");
    assert_eq!(resp["cached"], false);
    assert!(resp["clarifying_question"].is_null());
    let confidence = resp["confidence"].as_f64().unwrap();
    assert!((0.7..=1.0).contains(&confidence));
    assert_eq!(
        resp["keywords"],
        serde_json::json!(["kiln", "6", "shell", "temperature"])
    );
}

#[test]
fn test_resolve_ambiguous_asks_to_clarify() {
    let (_tmp, config_path) = setup_test_env();
    let resp = resolve_json(&config_path, "cooler fan speed", &[]);

    assert_eq!(resp["success"], false);
    assert_eq!(resp["confidence_label"], "low");
    assert_eq!(resp["next_step"], "clarify");
    assert!(resp["most_likely_path"].is_null());
    let question = resp["clarifying_question"].as_str().unwrap();
    assert!(question.contains("North.Cooler.Fan1.Speed"), "{}", question);
    let alternatives = resp["alternatives"].as_array().unwrap();
    assert!(alternatives.len() >= 2);
    assert!(resp["error"].is_null());
}

#[test]
fn test_resolve_stop_words_only_is_validation_error() {
    let (_tmp, config_path) = setup_test_env();
    let resp = resolve_json(&config_path, "show me the", &[]);

    assert_eq!(resp["success"], false);
    assert_eq!(resp["error_kind"], "validation");
    assert_eq!(resp["candidates"], serde_json::json!([]));
}

#[test]
fn test_resolve_no_match_reports_no_candidates() {
    let (_tmp, config_path) = setup_test_env();
    let resp = resolve_json(&config_path, "conveyor belt tension", &[]);

    assert_eq!(resp["success"], false);
    assert_eq!(resp["error_kind"], "no_candidates");
    assert_eq!(resp["confidence"], 0.0);
}

#[test]
fn test_resolve_served_from_file_cache_on_second_run() {
    let (_tmp, config_path) = setup_test_env();

    let mut first = resolve_json(&config_path, "kiln 6 shell temperature", &[]);
    let mut second = resolve_json(&config_path, "Kiln 6  shell temperature", &[]);
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);

    first["cached"] = serde_json::Value::Null;
    second["cached"] = serde_json::Value::Null;
    assert_eq!(first, second);
}

#[test]
fn test_resolve_bypass_cache_recomputes() {
    let (_tmp, config_path) = setup_test_env();

    resolve_json(&config_path, "kiln 6 shell temperature", &[]);
    let bypassed = resolve_json(
        &config_path,
        "kiln 6 shell temperature",
        &["--bypass-cache"],
    );
    assert_eq!(bypassed["cached"], false);
    assert_eq!(bypassed["success"], true);
}

#[test]
fn test_failures_are_not_cached() {
    let (tmp, config_path) = setup_test_env();

    resolve_json(&config_path, "conveyor belt tension", &[]);
    let cache_dir = tmp.path().join("cache");
    let entries = fs::read_dir(&cache_dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(entries, 0);
}

#[test]
fn test_missing_catalog_degrades_gracefully() {
    let (tmp, _) = setup_test_env();
    let config_path = write_config(tmp.path(), "does-not-exist.json", "");

    let resp = resolve_json(&config_path, "kiln shell temperature", &[]);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error_kind"], "no_candidates");
}

#[test]
fn test_search_reports_keyword_strategy() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_tagr(&config_path, &["search", "drive current"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("strategy: keyword"));
    assert!(stdout.contains("North.RawMill.Drive.Current"));
}

#[test]
fn test_vectors_build_then_vector_fallback() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_tagr(&config_path, &["vectors", "build"]);
    assert!(success, "vectors build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("records: 4"));
    assert!(tmp.path().join("data").join("vectors.json").exists());

    // Local catalog gone; only the vector artifact can answer.
    let config_path = write_config(tmp.path(), "does-not-exist.json", "");
    let (stdout, _, success) = run_tagr(&config_path, &["search", "drive current"]);
    assert!(success);
    assert!(stdout.contains("strategy: vector"), "{}", stdout);
    assert!(stdout.contains("North.RawMill.Drive.Current"));

    let resp = resolve_json(&config_path, "mill drive current", &[]);
    assert_eq!(resp["candidates"][0]["path"], "North.RawMill.Drive.Current");
    assert_eq!(
        resp["candidates"][0]["sources"],
        serde_json::json!(["vector-index"])
    );
}

#[test]
fn test_nonsense_with_vectors_built_reports_no_candidates() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_tagr(&config_path, &["vectors", "build"]);
    assert!(success, "vectors build failed: {}", stderr);

    let resp = resolve_json(&config_path, "zzqx blorf wibble", &[]);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error_kind"], "no_candidates");
    assert_eq!(resp["candidates"], serde_json::json!([]));
    assert!(resp["clarifying_question"].is_null());

    let (stdout, _, success) = run_tagr(&config_path, &["search", "zzqx blorf wibble"]);
    assert!(success);
    assert!(stdout.contains("No results."), "{}", stdout);
}

#[test]
fn test_invalid_config_fails() {
    let (tmp, _) = setup_test_env();
    let config_path = write_config(
        tmp.path(),
        "catalog.json",
        "[resolver]\nconfidence_threshold = 2.0\n",
    );

    let (_, stderr, success) = run_tagr(&config_path, &["resolve", "kiln"]);
    assert!(!success);
    assert!(stderr.contains("confidence_threshold"), "{}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_tagr(&tmp.path().join("nope.toml"), &["resolve", "kiln"]);
    assert!(!success);
    assert!(stderr.contains("config"), "{}", stderr);
}
