use clap::Parser;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.database.url, None);
    assert_eq!(
        settings.storage.timeout,
        Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS)
    );
    assert_eq!(
        settings.analytics.queue_capacity.get(),
        DEFAULT_ANALYTICS_QUEUE_CAPACITY
    );
}

#[test]
fn recorder_config_follows_analytics_settings() {
    let mut raw = RawSettings::default();
    raw.analytics.queue_capacity = Some(16);
    raw.analytics.enrichment_timeout_ms = Some(40);
    let settings = Settings::from_raw(raw).expect("valid settings");

    let recorder = RecorderConfig::from(&settings.analytics);
    assert_eq!(recorder.queue_capacity, 16);
    assert_eq!(recorder.enrichment_timeout, Duration::from_millis(40));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.storage.timeout_ms = Some(1_000);

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        storage_timeout_ms: Some(250),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.storage.timeout, Duration::from_millis(250));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_database_url_is_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url, None);
}

#[test]
fn zero_storage_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.storage.timeout_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "storage.timeout_ms",
            ..
        }
    ));
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.analytics.queue_capacity = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn unparsable_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn parse_report_arguments() {
    let id = Uuid::from_u128(42);
    let id_arg = id.to_string();
    let args = CliArgs::parse_from([
        "pressroom",
        "report",
        "--content-id",
        id_arg.as_str(),
        "--window-days",
        "7",
    ]);

    match args.command {
        Command::Report(report) => {
            assert_eq!(report.content_id, id);
            assert_eq!(report.window_days, 7);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn report_window_defaults_to_thirty_days() {
    let id = Uuid::from_u128(7).to_string();
    let args = CliArgs::parse_from(["pressroom", "report", "--content-id", id.as_str()]);
    match args.command {
        Command::Report(report) => assert_eq!(report.window_days, DEFAULT_REPORT_WINDOW_DAYS),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn global_overrides_parse_after_subcommand() {
    let args = CliArgs::parse_from([
        "pressroom",
        "publish-due",
        "--limit",
        "5",
        "--database-url",
        "postgres://override",
        "--log-json",
        "true",
    ]);

    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://override")
    );
    assert_eq!(args.overrides.log_json, Some(true));
    match args.command {
        Command::PublishDue(publish) => assert_eq!(publish.limit, Some(5)),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_command() {
    let args = CliArgs::parse_from(["pressroom", "migrate"]);
    assert!(matches!(args.command, Command::Migrate));
}

#[test]
fn parse_ingest_command() {
    let args = CliArgs::parse_from(["pressroom", "ingest", "--log-level", "warn"]);
    assert!(matches!(args.command, Command::Ingest));
    assert_eq!(args.overrides.log_level.as_deref(), Some("warn"));
}
