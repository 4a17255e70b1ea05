//! Configuration and prompt loading from disk

use pretty_assertions::assert_eq;
use std::fs;
use steward_kernel::config::{load_prompts, ConfigError};
use steward_kernel::StewardConfig;
use steward_policy::{PolicyEngine, PolicyRequest};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, text: &str) {
    fs::write(dir.path().join(name), text).unwrap();
}

#[test]
fn loads_file_with_relative_prompts_dir() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("prompts")).unwrap();
    for (name, text) in [
        ("planner.md", "You plan for {owner}."),
        ("zeta.md", "Z"),
        ("user.md", "U"),
        ("identity.md", "I"),
        ("alpha.md", "A"),
        ("soul.md", "S"),
    ] {
        fs::write(dir.path().join("prompts").join(name), text).unwrap();
    }
    write(
        &dir,
        "steward.toml",
        r#"
        [engine]
        prompts_dir = "prompts"

        [policy]
        denied_capabilities = ["browser"]
        "#,
    );

    let config = StewardConfig::load(&dir.path().join("steward.toml")).unwrap();
    let directives = config.directives().unwrap();

    assert_eq!(directives.planner, "You plan for {owner}.");
    assert_eq!(directives.worker, "I\n\n---\n\nS\n\n---\n\nU\n\n---\n\nA\n\n---\n\nZ");

    let policy = config.policy_engine().unwrap();
    assert!(policy
        .evaluate(&PolicyRequest::new("browser", "{}", "chat-1"))
        .is_denied());
    assert!(policy
        .evaluate(&PolicyRequest::new("shell", r#"{"command":"sudo reboot"}"#, "chat-1"))
        .is_denied());
}

#[test]
fn prompts_dir_wins_over_inline_directives() {
    let dir = TempDir::new().unwrap();
    write(&dir, "planner.md", "from file");
    write(&dir, "worker_directive.md", "worker from file");
    let config = StewardConfig::from_toml_str(&format!(
        "[engine]\nplanner_directive = \"inline\"\nprompts_dir = {:?}\n",
        dir.path()
    ))
    .unwrap();

    let directives = config.directives().unwrap();
    assert_eq!(directives.planner, "from file");
    assert_eq!(directives.worker, "worker from file");
}

#[test]
fn missing_planner_prompt_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "identity.md", "I");

    let err = load_prompts(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Prompts { .. }));
    assert!(err.to_string().contains("planner.md"));
}

#[test]
fn planner_prompt_alone_is_not_enough() {
    let dir = TempDir::new().unwrap();
    write(&dir, "planner.md", "P");
    write(&dir, "notes.txt", "ignored");

    let err = load_prompts(dir.path()).unwrap_err();
    assert!(err.to_string().contains("no worker directive files"));
}

#[test]
fn missing_file_and_bad_toml_are_reported() {
    let dir = TempDir::new().unwrap();
    let missing = StewardConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    write(&dir, "bad.toml", "[engine\nhistory_limit = 3");
    let bad = StewardConfig::load(&dir.path().join("bad.toml")).unwrap_err();
    assert!(matches!(bad, ConfigError::Parse(_)));
}
