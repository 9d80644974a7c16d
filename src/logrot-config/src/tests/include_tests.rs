use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::{Config, ConfigError};

#[test]
fn test_include_directory_in_reverse_order_skips_taboo() {
    let dir = TempDir::new().unwrap();
    let confd = dir.path().join("logrot.d");
    fs::create_dir(&confd).unwrap();
    fs::write(confd.join("alpha"), "/var/log/alpha.log {\n}\n").unwrap();
    fs::write(confd.join("beta"), "/var/log/beta.log {\n}\n").unwrap();
    fs::write(confd.join("beta.swp"), "garbage {\n").unwrap();

    let main = dir.path().join("logrot.conf");
    fs::write(&main, "weekly\ninclude logrot.d\n").unwrap();

    let config = Config::load(&[&main]).unwrap();
    let patterns: Vec<&str> = config
        .sections
        .iter()
        .map(|s| s.patterns[0].as_str())
        .collect();
    assert_eq!(patterns, vec!["/var/log/beta.log", "/var/log/alpha.log"]);
    assert!(
        config
            .sections
            .iter()
            .all(|s| s.policy.schedule == crate::Schedule::Weekly(None))
    );
}

#[test]
fn test_included_globals_affect_later_sections() {
    let dir = TempDir::new().unwrap();
    let extra = dir.path().join("extra.conf");
    fs::write(&extra, "rotate 9\n").unwrap();

    let main = dir.path().join("logrot.conf");
    fs::write(
        &main,
        format!(
            "/var/log/before.log {{\n}}\ninclude {}\n/var/log/after.log {{\n}}\n",
            extra.display()
        ),
    )
    .unwrap();

    let config = Config::load(&[&main]).unwrap();
    assert_eq!(config.sections[0].policy.rotate, 0);
    assert_eq!(config.sections[1].policy.rotate, 9);
}

#[test]
fn test_tabooext_changes_directory_scan() {
    let dir = TempDir::new().unwrap();
    let confd = dir.path().join("conf.d");
    fs::create_dir(&confd).unwrap();
    fs::write(confd.join("app"), "/var/log/app.log {\n}\n").unwrap();
    fs::write(confd.join("app.disabled"), "/var/log/off.log {\n}\n").unwrap();

    let main = dir.path().join("logrot.conf");
    fs::write(&main, "tabooext + .disabled\ninclude conf.d\n").unwrap();

    let config = Config::load(&[&main]).unwrap();
    assert_eq!(config.sections.len(), 1);
    assert_eq!(config.sections[0].patterns[0], "/var/log/app.log");
}

#[test]
fn test_missing_include_is_error() {
    let dir = TempDir::new().unwrap();
    let main = dir.path().join("logrot.conf");
    fs::write(&main, "include nowhere.conf\n").unwrap();

    let err = Config::load(&[&main]).unwrap_err();
    assert!(matches!(err, ConfigError::IncludeNotFound { line: 1, .. }));
}

#[test]
fn test_include_cycle_is_error() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.conf");
    let b = dir.path().join("b.conf");
    fs::write(&a, "include b.conf\n").unwrap();
    fs::write(&b, "include a.conf\n").unwrap();

    let err = Config::load(&[&a]).unwrap_err();
    assert!(matches!(err, ConfigError::IncludeCycle(_)));
}

#[test]
fn test_file_reached_twice_is_read_once() {
    let dir = TempDir::new().unwrap();
    let shared = dir.path().join("shared.conf");
    fs::write(&shared, "/var/log/shared.log {\n}\n").unwrap();

    let main = dir.path().join("logrot.conf");
    fs::write(&main, "include shared.conf\ninclude shared.conf\n").unwrap();

    let config = Config::load(&[&main, &shared]).unwrap();
    assert_eq!(config.sections.len(), 1);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&[dir.path().join("absent.conf")]).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_errors_name_the_included_file() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.conf");
    fs::write(&bad, "\n\nbogus\n").unwrap();
    let main = dir.path().join("logrot.conf");
    fs::write(&main, "include bad.conf\n").unwrap();

    match Config::load(&[&main]).unwrap_err() {
        ConfigError::UnknownDirective { path, line, .. } => {
            assert_eq!(path, bad);
            assert_eq!(line, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}
