//! File output tests
//!
//! Installs the global subscriber, so this binary holds a single test.

use calltrace_logging::{DiagnosticsBuilder, FileConfig, LogConfig, RotationStrategy};

#[test]
fn test_jsonl_file_output() {
    let dir = tempfile::tempdir().unwrap();
    let guard = DiagnosticsBuilder::new()
        .with_config(LogConfig {
            default_level: "debug".to_string(),
            ..LogConfig::default()
        })
        .with_console(false)
        .with_file_output(
            FileConfig::new(dir.path())
                .with_prefix("diagnostics")
                .with_rotation(RotationStrategy::Never),
        )
        .try_init()
        .unwrap()
        .expect("file output returns a guard");

    tracing::info!(sent = 1000u64, "Sent events to collector");
    tracing::trace!("filtered out");

    // A second install is rejected.
    assert!(DiagnosticsBuilder::new().try_init().is_err());

    drop(guard);
    let contents = std::fs::read_to_string(dir.path().join("diagnostics.log")).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "Sent events to collector");
    assert_eq!(lines[0]["sent"], 1000);
    assert_eq!(lines[0]["level"], "INFO");
}
