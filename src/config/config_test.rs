use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::Error;

fn cleanup_all_cache_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DCACHE__") {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let settings = Settings::default();

    assert_eq!(settings.close_delay.user_related_data_ms, 15_000);
    assert_eq!(settings.close_delay.device_related_data_ms, 60_000);
    assert_eq!(settings.close_delay.user_login_related_data_ms, 15_000);
    assert_eq!(settings.close_delay.composite_ms, 5_000);
    assert_eq!(settings.gate.max_wait_ms, 1_000);
    assert_eq!(settings.gate.wipe_timer_floor_ms, 10);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn load_should_merge_environment_overrides() {
    cleanup_all_cache_env_vars();
    with_vars(
        vec![
            ("DCACHE__GATE__MAX_WAIT_MS", Some("250")),
            ("DCACHE__CLOSE_DELAY__COMPOSITE_MS", Some("0")),
        ],
        || {
            let settings = Settings::load(None).unwrap();

            assert_eq!(settings.gate.max_wait_ms, 250);
            assert_eq!(settings.close_delay.composite_ms, 0);
            // untouched values keep their defaults
            assert_eq!(settings.close_delay.device_related_data_ms, 60_000);
        },
    );
}

#[test]
#[serial]
fn load_should_merge_file_settings() {
    cleanup_all_cache_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cache.toml");

    std::fs::write(
        &config_path,
        r#"
        [close_delay]
        user_related_data_ms = 2000

        [gate]
        max_wait_ms = 400
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let settings = Settings::load(Some(config_path.to_str().unwrap())).expect("success");

        assert_eq!(settings.close_delay.user_related_data_ms, 2000);
        assert_eq!(settings.close_delay.user_login_related_data_ms, 15_000);
        assert_eq!(settings.gate.max_wait_ms, 400);
    });
}

#[test]
#[serial]
fn environment_should_win_over_file() {
    cleanup_all_cache_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cache.toml");
    std::fs::write(&config_path, "[gate]\nmax_wait_ms = 400\n").unwrap();

    with_vars(vec![("DCACHE__GATE__MAX_WAIT_MS", Some("700"))], || {
        let settings = Settings::load(Some(config_path.to_str().unwrap())).unwrap();
        assert_eq!(settings.gate.max_wait_ms, 700);
    });
}

#[test]
#[serial]
fn load_should_fail_for_missing_file() {
    cleanup_all_cache_env_vars();
    let result = Settings::load(Some("/definitely/not/here/cache"));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn validation_should_reject_zero_gate_wait() {
    let mut settings = Settings::default();
    settings.gate.max_wait_ms = 0;

    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn validation_should_reject_floor_above_wait() {
    let mut settings = Settings::default();
    settings.gate.max_wait_ms = 5;
    settings.gate.wipe_timer_floor_ms = 50;

    assert!(settings.validate().is_err());
}

#[test]
fn validation_should_reject_excessive_delay() {
    let mut settings = Settings::default();
    settings.close_delay.device_related_data_ms = 2 * 60 * 60 * 1000;

    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains("device_related_data_ms"));
}

#[test]
fn disabled_close_delays_are_valid() {
    let settings = Settings {
        close_delay: CloseDelayConfig::disabled(),
        ..Default::default()
    };

    assert!(settings.validate().is_ok());
    assert!(settings.close_delay.user_related_data().is_zero());
}
