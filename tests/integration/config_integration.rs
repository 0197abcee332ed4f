//! Integration tests for Configuration System

use std::sync::Mutex;
use tempfile::TempDir;
use workctx::config::{workspace_config_path, ConfigLoader};

// Serialize access to process environment across tests in this binary
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Apply `vars`, run `f`, then restore the previous environment.
fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
        .collect();
    for (key, value) in vars {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    let result = f();
    for (key, value) in saved {
        match value {
            Some(v) => std::env::set_var(&key, v),
            None => std::env::remove_var(&key),
        }
    }
    result
}

fn write_workspace_config(root: &std::path::Path, contents: &str) {
    let path = workspace_config_path(root);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_load_defaults_without_files() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    let xdg_path = xdg.path().to_string_lossy().to_string();

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_path.as_str())),
            ("WORKCTX_RUN__UNITS", None),
            ("WORKCTX_RUN__PAUSE", None),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );

    assert_eq!(config.run.units, 2000);
    assert_eq!(config.run.max_concurrent, 200);
    assert!(config.run.pause);
    assert_eq!(config.logging.output, "stderr");
}

#[test]
fn test_workspace_overrides_global() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    let global_dir = xdg.path().join("workctx");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(
        global_dir.join("config.toml"),
        r#"
[run]
units = 5
io_delay_ms = 7
"#,
    )
    .unwrap();
    write_workspace_config(
        workspace.path(),
        r#"
[run]
units = 10
"#,
    );
    let xdg_path = xdg.path().to_string_lossy().to_string();

    let config = with_env(
        &[("XDG_CONFIG_HOME", Some(xdg_path.as_str())), ("WORKCTX_RUN__UNITS", None)],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );

    assert_eq!(config.run.units, 10);
    assert_eq!(config.run.io_delay_ms, 7);
}

#[test]
fn test_environment_overrides_files() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    write_workspace_config(
        workspace.path(),
        r#"
[run]
units = 10
dispose_on_complete = false
"#,
    );
    let xdg_path = xdg.path().to_string_lossy().to_string();

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_path.as_str())),
            ("WORKCTX_RUN__UNITS", Some("42")),
            ("WORKCTX_RUN__DISPOSE_ON_COMPLETE", Some("true")),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );

    assert_eq!(config.run.units, 42);
    assert!(config.run.dispose_on_complete);
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("probe.toml");
    std::fs::write(
        &config_file,
        r#"
[run]
units = 3
max_concurrent = 1
buffer_size = 16

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.run.units, 3);
    assert_eq!(config.run.max_concurrent, 1);
    assert_eq!(config.run.io_delay_ms, 1000);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_load_from_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_environment_disables_pause() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    let xdg_path = xdg.path().to_string_lossy().to_string();

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_path.as_str())),
            ("WORKCTX_RUN__PAUSE", Some("false")),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );

    assert!(!config.run.pause);
}
