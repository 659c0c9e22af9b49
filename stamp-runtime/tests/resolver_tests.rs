//! Context resolution against real `sh` processes.

use std::time::{Duration, Instant};

use serde_json::json;
use stamp_core::{config::parse_at, Config, Mode, DEFAULT_CONFIG_FILE};
use stamp_runtime::{resolve, resolve_one, BanDefaults, ResolveError, ResolveOptions, VarError};
use tempfile::TempDir;

fn config(dir: &TempDir, toml: &str) -> Config {
    parse_at(toml, &dir.path().join(DEFAULT_CONFIG_FILE)).expect("config")
}

fn opts(dir: &TempDir) -> ResolveOptions {
    ResolveOptions::new(dir.path())
}

fn failures(err: ResolveError) -> Vec<(String, VarError)> {
    match err {
        ResolveError::Variables(f) => f,
        other => panic!("expected variable failures, got {other}"),
    }
}

#[tokio::test]
async fn resolves_all_kinds() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("STAMP_RT_GREETING", "hello");
    let cfg = config(
        &dir,
        r#"
        [context.static]
        NAME = "World"
        COUNT = { value = "3", coerce = "int" }

        [context.env]
        GREETING = { env_name = "STAMP_RT_GREETING" }

        [context.cli]
        ANSWER = { commands = ["echo first", "echo 42"], coerce = "int" }
        "#,
    );

    let ctx = resolve(&cfg, &opts(&dir)).await.unwrap();
    assert_eq!(ctx.get("NAME"), Some(&json!("World")));
    assert_eq!(ctx.get("COUNT"), Some(&json!(3)));
    assert_eq!(ctx.get("GREETING"), Some(&json!("hello")));
    assert_eq!(ctx.get("ANSWER"), Some(&json!(42)));
}

#[tokio::test]
async fn cli_commands_run_in_the_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("VERSION"), "1.4.0\n").unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.cli]
        VERSION = { commands = ["cat VERSION"] }
        "#,
    );
    let ctx = resolve(&cfg, &opts(&dir)).await.unwrap();
    assert_eq!(ctx.get("VERSION"), Some(&json!("1.4.0")));
}

#[tokio::test]
async fn cli_variables_resolve_concurrently() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.cli]
        A = { commands = ["sleep 0.5; echo a"] }
        B = { commands = ["sleep 0.5; echo b"] }
        "#,
    );

    let started = Instant::now();
    let ctx = resolve(&cfg, &opts(&dir)).await.unwrap();
    let elapsed = started.elapsed();
    assert_eq!(ctx.get("A"), Some(&json!("a")));
    assert_eq!(ctx.get("B"), Some(&json!("b")));
    assert!(elapsed >= Duration::from_millis(500), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
}

#[tokio::test]
async fn every_failure_is_reported_sorted_by_name() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.static]
        OK = "fine"

        [context.env]
        M_MISSING = { env_name = "STAMP_RT_DEFINITELY_UNSET" }

        [context.cli]
        Z_FAIL = { commands = ["echo boom >&2; exit 3"] }
        A_EMPTY = { commands = ["true"] }
        "#,
    );

    let failed = failures(resolve(&cfg, &opts(&dir)).await.unwrap_err());
    let names: Vec<&str> = failed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["A_EMPTY", "M_MISSING", "Z_FAIL"]);
    assert!(matches!(failed[0].1, VarError::ImplicitNone { .. }));
    assert!(matches!(failed[1].1, VarError::MissingEnvVar { .. }));
    let message = failed[2].1.to_string();
    assert!(message.contains("exit code 3"), "{message}");
    assert!(message.contains("boom"), "{message}");
}

#[tokio::test]
async fn coercion_failure_names_the_variable() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.cli]
        PORT = { commands = ["echo not-a-number"], coerce = "int" }
        "#,
    );
    let failed = failures(resolve(&cfg, &opts(&dir)).await.unwrap_err());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "PORT");
    assert!(matches!(failed[0].1, VarError::Coercion(_)));
}

#[tokio::test]
async fn light_modes_skip_cli_commands() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.cli]
        WITH_LIGHT = { commands = ["exit 1"], light = { value = "7", coerce = "int" } }
        WITHOUT = { commands = ["exit 1"] }
        "#,
    );

    for mode in [Mode::Light, Mode::Superlight] {
        let mut o = opts(&dir);
        o.mode = mode;
        let ctx = resolve(&cfg, &o).await.unwrap();
        assert_eq!(ctx.get("WITH_LIGHT"), Some(&json!(7)), "{mode}");
        assert_eq!(ctx.get("WITHOUT"), Some(&json!("")), "{mode}");
    }
}

#[tokio::test]
async fn env_defaults_can_be_banned() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("STAMP_RT_BAN_SET", "from-env");
    std::env::remove_var("STAMP_RT_BAN_UNSET_1");
    std::env::remove_var("STAMP_RT_BAN_UNSET_2");
    let cfg = config(
        &dir,
        r#"
        [context.env]
        SET = { env_name = "STAMP_RT_BAN_SET", default = "unused" }
        FIRST = { env_name = "STAMP_RT_BAN_UNSET_1", default = "one" }
        SECOND = { env_name = "STAMP_RT_BAN_UNSET_2", default = "two" }
        "#,
    );

    let ctx = resolve(&cfg, &opts(&dir)).await.unwrap();
    assert_eq!(ctx.get("FIRST"), Some(&json!("one")));
    assert_eq!(ctx.get("SET"), Some(&json!("from-env")));

    let mut banned_all = opts(&dir);
    banned_all.ban_defaults = Some(BanDefaults::from_names(Vec::new()));
    let failed = failures(resolve(&cfg, &banned_all).await.unwrap_err());
    let names: Vec<&str> = failed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["FIRST", "SECOND"]);
    assert!(failed
        .iter()
        .all(|(_, e)| matches!(e, VarError::BannedDefault { .. })));

    let mut banned_one = opts(&dir);
    banned_one.ban_defaults = Some(BanDefaults::from_names(vec!["SECOND".into()]));
    let failed = failures(resolve(&cfg, &banned_one).await.unwrap_err());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "SECOND");
}

#[tokio::test]
async fn unknown_ban_name_is_rejected_before_resolving() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.env]
        HOME_DIR = { env_name = "HOME", default = "/" }

        [context.cli]
        SIDE_EFFECT = { commands = ["touch ran"] }
        "#,
    );
    let mut o = opts(&dir);
    o.ban_defaults = Some(BanDefaults::from_names(vec!["NOPE".into()]));
    let err = resolve(&cfg, &o).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnrecognizedBanName { .. }));
    assert!(err.to_string().contains("HOME_DIR"), "{err}");
    assert!(!dir.path().join("ran").exists());
}

#[tokio::test]
async fn resolve_one_runs_only_the_requested_variable() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir,
        r#"
        [context.cli]
        WANTED = { commands = ["echo yes"] }
        BROKEN = { commands = ["exit 1"] }
        "#,
    );
    let value = resolve_one(&cfg, &opts(&dir), "WANTED").await.unwrap();
    assert_eq!(value, json!("yes"));

    let err = resolve_one(&cfg, &opts(&dir), "MISSING").await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownVariable { .. }));
    assert!(err.to_string().contains("WANTED"), "{err}");
}
