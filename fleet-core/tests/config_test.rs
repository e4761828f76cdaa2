use fleet_core::{
    ConfigError, FleetConfig, Operation, Pause, RetryPolicy, RetrySettings, MAX_RETRY_DELAY_SECS,
};
use std::time::Duration;

#[test]
fn test_pause_accepts_number_or_pair() {
    let fixed: Pause = serde_json::from_str("5").unwrap();
    assert_eq!(fixed, Pause::Fixed(5));

    let range: Pause = serde_json::from_str("[10, 30]").unwrap();
    assert_eq!(range, Pause::Range(10, 30));
}

#[test]
fn test_pause_range_samples_inside_bounds() {
    let pause = Pause::Range(2, 4);
    for _ in 0..100 {
        let d = pause.sample();
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4));
    }
    assert_eq!(Pause::Fixed(7).sample(), Duration::from_secs(7));
}

#[test]
fn test_fleet_config_defaults() {
    let config: FleetConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, FleetConfig::default());
    assert_eq!(config.max_parallel_accounts, 1);
    assert_eq!(config.retry.retries, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fleet_config_full_document() {
    let config: FleetConfig = serde_json::from_str(
        r#"{
            "max_parallel_accounts": 4,
            "pause_between_wallets": [5, 15],
            "pause_between_modules": 3,
            "shuffle_wallets": true,
            "retry": { "retries": 5, "delay_secs": 0.5 }
        }"#,
    )
    .unwrap();

    assert_eq!(config.max_parallel_accounts, 4);
    assert_eq!(config.pause_between_wallets, Pause::Range(5, 15));
    assert_eq!(config.pause_between_modules, Pause::Fixed(3));
    assert!(config.shuffle_wallets);
    assert_eq!(config.retry.retries, 5);
    assert_eq!(config.retry.backoff, 2.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_parallelism_rejected() {
    let config = FleetConfig {
        max_parallel_accounts: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { field, .. }) if field == "max_parallel_accounts"
    ));
}

#[test]
fn test_inverted_range_rejected() {
    let config = FleetConfig {
        pause_between_modules: Pause::Range(30, 10),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { field, .. }) if field == "pause_between_modules"
    ));
}

#[test]
fn test_retry_settings_rejected() {
    let shrinking = FleetConfig {
        retry: RetrySettings {
            backoff: 0.5,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(shrinking.validate().is_err());

    let unbounded = FleetConfig {
        retry: RetrySettings {
            attempt_timeout_secs: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(unbounded.validate().is_err());
}

fn retry_field_error(retry: RetrySettings) -> Option<String> {
    let config = FleetConfig {
        retry,
        ..Default::default()
    };
    match config.validate() {
        Err(ConfigError::InvalidValue { field, .. }) => Some(field),
        _ => None,
    }
}

#[test]
fn test_unbounded_retry_delays_rejected() {
    let cases = [
        (
            RetrySettings {
                delay_secs: f64::INFINITY,
                ..Default::default()
            },
            "retry.delay_secs",
        ),
        (
            RetrySettings {
                delay_secs: f64::NAN,
                ..Default::default()
            },
            "retry.delay_secs",
        ),
        (
            RetrySettings {
                delay_secs: 1e30,
                ..Default::default()
            },
            "retry.delay_secs",
        ),
        (
            RetrySettings {
                backoff: f64::INFINITY,
                ..Default::default()
            },
            "retry.backoff",
        ),
        (
            RetrySettings {
                max_delay_secs: u64::MAX,
                ..Default::default()
            },
            "retry.max_delay_secs",
        ),
    ];

    for (retry, field) in cases {
        assert_eq!(retry_field_error(retry).as_deref(), Some(field));
    }

    let at_limit = RetrySettings {
        delay_secs: MAX_RETRY_DELAY_SECS as f64,
        max_delay_secs: MAX_RETRY_DELAY_SECS,
        ..Default::default()
    };
    assert_eq!(retry_field_error(at_limit), None);
}

#[test]
fn test_retry_policy_from_settings() {
    let policy = RetryPolicy::from_settings(&RetrySettings {
        retries: 2,
        delay_secs: 1.0,
        backoff: 3.0,
        attempt_timeout_secs: 10,
        max_delay_secs: 5,
    });
    assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    assert_eq!(policy.delay_for(1), Duration::from_secs(3));
    assert_eq!(policy.delay_for(2), Duration::from_secs(5));
}

#[test]
fn test_operation_tags_parse_case_insensitive() {
    let ops = Operation::parse_list(&["faucet", "CHAT_WITH_AGENTS"]).unwrap();
    assert_eq!(ops, vec![Operation::Faucet, Operation::ChatWithAgents]);

    let err = Operation::parse_list(&["FAUCET", "MINT_NFT"]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownOperation {
            tag: "MINT_NFT".to_string()
        }
    );
}
