use std::sync::Mutex;

use sift_config::{
    discover_config_path, load_for_workspace, ConfigError, SiftConfig, SIFT_CONFIG_ENV_VAR,
};

// Discovery reads a process-wide env var; serialize the tests that depend on it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn missing_config_yields_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    std::env::remove_var(SIFT_CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();

    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(config, SiftConfig::default());
    assert!(path.is_none());
}

#[test]
fn prefers_sift_toml_over_dotfile() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    std::env::remove_var(SIFT_CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".sift.toml"), "max_suggestions = 3\n").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(dir.path().join(".sift.toml"))
    );

    std::fs::write(dir.path().join("sift.toml"), "max_suggestions = 7\n").unwrap();
    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(path, Some(dir.path().join("sift.toml")));
    assert_eq!(config.max_suggestions, 7);
}

#[test]
fn env_var_overrides_discovery_relative_to_root() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("conf")).unwrap();
    std::fs::write(
        dir.path().join("conf/completion.toml"),
        "enable_auto_activation = false\nauto_activation_delay_ms = 0\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("sift.toml"), "max_suggestions = 7\n").unwrap();

    std::env::set_var(SIFT_CONFIG_ENV_VAR, "conf/completion.toml");
    let loaded = load_for_workspace(dir.path());
    std::env::remove_var(SIFT_CONFIG_ENV_VAR);

    let (config, path) = loaded.unwrap();
    assert_eq!(path, Some(dir.path().join("conf/completion.toml")));
    assert!(!config.enable_auto_activation);
    assert_eq!(config.auto_activation_delay_ms, 0);
    assert_eq!(config.max_suggestions, 20);
}

#[test]
fn unreadable_env_path_is_an_io_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().unwrap();

    std::env::set_var(SIFT_CONFIG_ENV_VAR, "missing.toml");
    let loaded = load_for_workspace(dir.path());
    std::env::remove_var(SIFT_CONFIG_ENV_VAR);

    assert!(matches!(loaded, Err(ConfigError::Io { .. })));
}

#[test]
fn file_blacklist_from_loaded_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "file_blacklist = [\"*.min.js\", \".*\"]\n").unwrap();

    let config = SiftConfig::load_from_path(&path).unwrap();
    let blacklist = config.file_blacklist();
    assert!(blacklist.is_blacklisted(&dir.path().join("bundle.min.js")));
    assert!(blacklist.is_blacklisted(&dir.path().join(".env")));
    assert!(!blacklist.is_blacklisted(&dir.path().join("main.js")));
}
