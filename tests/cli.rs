use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn careline_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("careline");
    path
}

fn write_config(root: &Path) -> PathBuf {
    let config_content = format!(
        r#"[openai]
model = "gpt-4o-mini"
embedding_model = "text-embedding-3-small"

[paths]
documents = "{root}/docs"
index = "{root}/storage/index.bin"
metadata = "{root}/storage/metadata.json"
"#,
        root = root.display()
    );
    let config_path = root.join("config.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("dehydration.md"),
        "# Dehydration\n\nDehydration happens when the body loses more fluid than it takes in.\n\n\
         Common signs include thirst, dark urine, dizziness, and tiredness. Drinking water \
         regularly through the day helps prevent it.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("chest-pain.txt"),
        "Chest pain can have many causes. Sudden crushing chest pain, especially with shortness \
         of breath, can signal a heart attack and needs emergency care.",
    )
    .unwrap();

    let config_path = write_config(&root);
    (tmp, config_path)
}

/// Run the binary hermetically: no API key in the environment, so any code
/// path that reaches for the credential fails in a known way.
fn run_careline(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = careline_binary();
    let output = Command::new(&binary)
        .env_remove("OPENAI_API_KEY")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run careline binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_build_dry_run_reports_counts_without_writing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_careline(&config_path, &["build", "--dry-run"]);
    assert!(
        success,
        "dry-run failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("from 2 documents"), "got: {}", stdout);
    assert!(stdout.contains("dehydration.md"));
    assert!(stdout.contains("Dry run complete."));

    // Nothing may be written and no credential is needed
    assert!(!tmp.path().join("storage").exists());
}

#[test]
fn test_build_empty_documents_dir_fails_before_writing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    fs::create_dir_all(root.join("docs")).unwrap();
    let config_path = write_config(&root);

    let (stdout, stderr, success) = run_careline(&config_path, &["build"]);
    assert!(!success, "build should fail on an empty corpus");
    assert!(stdout.contains("Ingested 0 chunks"), "got: {}", stdout);
    assert!(stderr.contains("No text chunks found"), "got: {}", stderr);
    assert!(!root.join("storage").exists());
}

#[test]
fn test_build_missing_documents_dir() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path());

    let (_, stderr, success) = run_careline(&config_path, &["build"]);
    assert!(!success);
    assert!(
        stderr.contains("Documents directory not found"),
        "got: {}",
        stderr
    );
}

#[test]
fn test_build_without_api_key_fails_after_ingestion() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_careline(&config_path, &["build"]);
    assert!(!success);
    // Ingestion runs first, then the missing credential stops the build
    assert!(stdout.contains("Ingested 2 chunks"), "got: {}", stdout);
    assert!(stderr.contains("OPENAI_API_KEY"), "got: {}", stderr);
}

#[test]
fn test_query_commands_before_build_name_missing_index() {
    let (tmp, config_path) = setup_test_env();

    for args in [
        &["search", "dehydration"][..],
        &["ask", "What are signs of dehydration?"][..],
        &["chat"][..],
    ] {
        let (stdout, stderr, success) = run_careline(&config_path, args);
        assert!(!success, "{:?} should fail before any build", args);
        assert!(
            stderr.contains("Vector index not found"),
            "{:?} stderr: {}",
            args,
            stderr
        );
        assert!(
            stderr.contains("careline build"),
            "{:?} stderr should point at `careline build`: {}",
            args,
            stderr
        );
        assert!(stdout.is_empty(), "{:?} stdout: {}", args, stdout);
    }

    assert!(!tmp.path().join("storage").exists());
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("no-such-config.toml");

    let (_, stderr, success) = run_careline(&config_path, &["build", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("Config file not found"), "got: {}", stderr);
}

#[test]
fn test_rejects_overlap_not_smaller_than_chunk_size() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    fs::create_dir_all(root.join("docs")).unwrap();

    let config_content = format!(
        r#"[openai]
model = "gpt-4o-mini"
embedding_model = "text-embedding-3-small"

[paths]
documents = "{root}/docs"
index = "{root}/storage/index.bin"
metadata = "{root}/storage/metadata.json"

[rag]
chunk_size = 100
chunk_overlap = 100
"#,
        root = root.display()
    );
    let config_path = root.join("config.toml");
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_careline(&config_path, &["build", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "got: {}", stderr);
}

#[test]
fn test_example_config_parses() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let example = manifest_dir.join("config.example.toml");
    assert!(example.exists(), "config.example.toml is missing");

    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config.toml");
    fs::copy(&example, &config_path).unwrap();

    // Run from the temp dir so the example's relative paths resolve there.
    // The documents directory does not exist, so a dry-run build must fail
    // on the documents path, not on config parsing.
    let output = Command::new(careline_binary())
        .env_remove("OPENAI_API_KEY")
        .current_dir(tmp.path())
        .arg("--config")
        .arg(&config_path)
        .args(["build", "--dry-run"])
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(!output.status.success());
    assert!(
        stderr.contains("Documents directory not found"),
        "example config should parse cleanly, got: {}",
        stderr
    );
}
