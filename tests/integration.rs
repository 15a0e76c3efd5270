use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docmind_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docmind");
    path
}

fn write_config(root: &Path, extra: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/docmind.sqlite"

[chunking]
chunk_size = 200
overlap = 50

[embedding]
provider = "disabled"
dims = 8

[generation]
provider = "ollama"
model = "llama3.2"
url = "http://127.0.0.1:9"
timeout_secs = 2
max_retries = 0

{}
"#,
        root.display(),
        extra
    );

    let config_path = config_dir.join("docmind.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("warranty.txt"),
        "The warranty covers manufacturing defects for two years from the date of purchase. \
         Damage caused by water, drops or unauthorized repairs is not covered.",
    )
    .unwrap();
    fs::write(files_dir.join("empty.txt"), "").unwrap();
    fs::write(files_dir.join("binary.dat"), [0xffu8, 0xfe, 0x00, 0x01]).unwrap();

    let config_path = write_config(&root, "");
    (tmp, config_path)
}

fn run_docmind(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docmind_binary();
    // Run from the temp root so no stray .env is picked up.
    let workdir = config_path.parent().and_then(Path::parent).unwrap();
    let output = Command::new(&binary)
        .current_dir(workdir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docmind binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docmind(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(stdout.contains("8 dimensions"));
    assert!(tmp.path().join("data/docmind.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docmind(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docmind(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_init_rejects_changed_dims() {
    let (tmp, config_path) = setup_test_env();
    let (_, _, success) = run_docmind(&config_path, &["init"]);
    assert!(success);

    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("dims = 8", "dims = 16");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_docmind(&config_path, &["init"]);
    assert!(!success, "init with different dims should fail");
    assert!(stderr.contains("dimension"), "stderr: {}", stderr);
    drop(tmp);
}

#[test]
fn test_stats_empty_store() {
    let (_tmp, config_path) = setup_test_env();
    run_docmind(&config_path, &["init"]);

    let (stdout, stderr, success) = run_docmind(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Records:     0"), "stdout: {}", stdout);
    assert!(stdout.contains("Dimensions:  8"));
}

#[test]
fn test_stats_before_init_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docmind(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("docmind init"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("config/nope.toml");
    let (_, stderr, success) = run_docmind(&missing, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_chunking_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "");
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("overlap = 50", "overlap = 200");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_docmind(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr: {}", stderr);
}

#[test]
fn test_upload_with_disabled_embedding_names_chunk() {
    let (tmp, config_path) = setup_test_env();
    run_docmind(&config_path, &["init"]);

    let file = tmp.path().join("files/warranty.txt");
    let (_, stderr, success) = run_docmind(&config_path, &["upload", file.to_str().unwrap()]);
    assert!(!success, "upload should fail with embeddings disabled");
    assert!(stderr.contains("ingestion"), "stderr: {}", stderr);
    assert!(stderr.contains("chunk 0"), "stderr: {}", stderr);
    assert!(stderr.contains("warranty.txt"), "stderr: {}", stderr);

    let (stdout, _, _) = run_docmind(&config_path, &["stats"]);
    assert!(stdout.contains("Records:     0"));
}

#[test]
fn test_upload_empty_file_stores_nothing() {
    let (tmp, config_path) = setup_test_env();
    run_docmind(&config_path, &["init"]);

    let file = tmp.path().join("files/empty.txt");
    let (stdout, stderr, success) = run_docmind(
        &config_path,
        &["upload", file.to_str().unwrap(), "--source", "blank"],
    );
    assert!(success, "empty upload failed: {}", stderr);
    assert!(stdout.contains("blank: 0 chunks stored"), "stdout: {}", stdout);
}

#[test]
fn test_upload_binary_file_rejected() {
    let (tmp, config_path) = setup_test_env();
    run_docmind(&config_path, &["init"]);

    let file = tmp.path().join("files/binary.dat");
    let (_, stderr, success) = run_docmind(&config_path, &["upload", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("UTF-8"), "stderr: {}", stderr);
}

#[test]
fn test_chat_names_failed_stage() {
    let (_tmp, config_path) = setup_test_env();
    run_docmind(&config_path, &["init"]);

    // The disabled embedder fails the question embedding.
    let (_, stderr, success) = run_docmind(&config_path, &["chat", "How long is the warranty?"]);
    assert!(!success);
    assert!(stderr.contains("retrieval stage failed"), "stderr: {}", stderr);
}

#[test]
fn test_chat_requires_generation_key() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "");
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("provider = \"ollama\"", "provider = \"gemini\"");
    fs::write(&config_path, content).unwrap();
    run_docmind(&config_path, &["init"]);

    let (_, stderr, success) = run_docmind(&config_path, &["chat", "anything?"]);
    assert!(!success);
    assert!(stderr.contains("GEMINI_API_KEY"), "stderr: {}", stderr);
}
