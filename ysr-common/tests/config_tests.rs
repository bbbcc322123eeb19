//! Root folder resolution priority tests
//!
//! Tests that manipulate YSR_ROOT_FOLDER are marked #[serial] so they don't
//! race each other.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use ysr_common::config::{
    resolve_root_folder, CompiledDefaults, TomlConfig, ROOT_FOLDER_ENV,
};

fn toml_with_root(path: &str) -> TomlConfig {
    TomlConfig {
        root_folder: Some(PathBuf::from(path)),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ysr-from-env");
    let resolved = resolve_root_folder(
        Some(Path::new("/tmp/ysr-from-cli")),
        &toml_with_root("/tmp/ysr-from-toml"),
    );
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/ysr-from-cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ysr-from-env");
    let resolved = resolve_root_folder(None, &toml_with_root("/tmp/ysr-from-toml"));
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/ysr-from-env"));
}

#[test]
#[serial]
fn test_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = resolve_root_folder(None, &toml_with_root("/tmp/ysr-from-toml"));
    assert_eq!(resolved, PathBuf::from("/tmp/ysr-from-toml"));
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let resolved = resolve_root_folder(None, &toml_with_root("/tmp/ysr-from-toml"));
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/ysr-from-toml"));
}

#[test]
#[serial]
fn test_compiled_default_last() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_toml_sections_parse() {
    let config: TomlConfig = toml::from_str(
        r#"
        root_folder = "/srv/ysr"
        bind_address = "0.0.0.0:5810"

        [logging]
        level = "debug"

        [openai]
        model = "gpt-4o"
        max_tokens = 2000

        [import]
        extractor = "columns"
        max_upload_mb = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/ysr")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.openai.model.as_deref(), Some("gpt-4o"));
    assert_eq!(config.openai.max_tokens, Some(2000));
    assert_eq!(config.openai.api_key, None);
    assert_eq!(config.import.extractor.as_deref(), Some("columns"));
    assert_eq!(config.import.max_upload_mb, Some(5));
}
