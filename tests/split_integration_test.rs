// ABOUTME: Integration tests for the control/region split workflow
// ABOUTME: Drives the full sequence with a recording executor and in-memory mappings

use anyhow::Result;
use async_trait::async_trait;
use postgres_silo_splitter::commands::{execute_split, SplitOptions};
use postgres_silo_splitter::config::parse_manifest;
use postgres_silo_splitter::executor::{ExecOutput, ProcessExecutor};
use postgres_silo_splitter::migration::{
    MappingRevision, OrganizationMappingStore, SiloSplitter, SplitStep,
};
use postgres_silo_splitter::silo::{
    SiloMode, TableSiloInfo, CONTROL_SEED_TABLES, REGION_SEED_TABLES,
};
use std::sync::{Arc, Mutex};

type EventLog = Arc<Mutex<Vec<String>>>;

/// Executor that records every command and fails those matching a marker
struct RecordingExecutor {
    log: EventLog,
    fail_marker: Option<&'static str>,
}

impl ProcessExecutor for RecordingExecutor {
    fn run(&self, container: &str, command: &str) -> Result<ExecOutput> {
        self.log
            .lock()
            .unwrap()
            .push(format!("exec[{}] {}", container, command));
        let failed = self
            .fail_marker
            .is_some_and(|marker| command.contains(marker));
        Ok(ExecOutput {
            exit_code: if failed { 2 } else { 0 },
            output: if failed {
                "pg_dump: error: connection failed".to_string()
            } else {
                String::new()
            },
        })
    }
}

/// Mapping table kept in memory; records when it is touched
struct MemoryMappings {
    log: EventLog,
    regions: Mutex<Vec<String>>,
}

#[async_trait]
impl OrganizationMappingStore for MemoryMappings {
    async fn reassign_region(&self, from: &str, to: &str) -> Result<u64> {
        self.log
            .lock()
            .unwrap()
            .push(format!("mappings {} -> {}", from, to));
        let mut regions = self.regions.lock().unwrap();
        let mut updated = 0;
        for region in regions.iter_mut().filter(|r| r.as_str() == from) {
            *region = to.to_string();
            updated += 1;
        }
        Ok(updated)
    }
}

fn options(monolith_region: &str, legacy_region_name: &str, reset: bool) -> SplitOptions {
    SplitOptions {
        database: "sentry".to_string(),
        legacy_region_name: legacy_region_name.to_string(),
        monolith_region: monolith_region.to_string(),
        reset,
        verbose: false,
    }
}

fn table_args(command: &str) -> Vec<String> {
    let words: Vec<&str> = command.split_whitespace().collect();
    words
        .windows(2)
        .filter(|pair| pair[0] == "-t")
        .map(|pair| pair[1].to_string())
        .collect()
}

fn sample_tables() -> Vec<TableSiloInfo> {
    vec![
        TableSiloInfo::new("sentry_user", &[SiloMode::Control]),
        TableSiloInfo::new("sentry_project", &[SiloMode::Region]),
        TableSiloInfo::new("sentry_option", &[SiloMode::Control, SiloMode::Region]),
        TableSiloInfo::unassigned("sentry_mystery"),
    ]
}

#[tokio::test]
async fn test_full_split_sequence() {
    let log: EventLog = Arc::default();
    let store = MemoryMappings {
        log: log.clone(),
        regions: Mutex::new(vec!["old-region".to_string(); 4]),
    };
    let splitter = SiloSplitter::new(
        RecordingExecutor {
            log: log.clone(),
            fail_marker: None,
        },
        "sentry-postgres-1",
    );

    let run = execute_split(
        &sample_tables(),
        &store,
        &splitter,
        &options("us", "old-region", true),
    )
    .await
    .unwrap();

    assert_eq!(
        run.mappings,
        MappingRevision::Updated {
            count: 4,
            from: "old-region".to_string(),
            to: "us".to_string(),
        }
    );
    assert!(run.is_success());
    assert_eq!(run.tables.unassigned, vec!["sentry_mystery"]);

    let events = log.lock().unwrap().clone();
    // mapping rewrite + 5 control steps + 5 region steps
    assert_eq!(events.len(), 11);
    assert_eq!(events[0], "mappings old-region -> us");
    assert!(events[1].contains("/tmp/control-tables.sql"));
    assert!(events[5].ends_with("psql -U postgres control < /tmp/control-tables.sql"));
    assert!(events[6].contains("/tmp/region-tables.sql"));
    assert!(events[10].ends_with("psql -U postgres region < /tmp/region-tables.sql"));
    assert!(events[1..]
        .iter()
        .all(|e| e.starts_with("exec[sentry-postgres-1] ")));
}

#[tokio::test]
async fn test_dump_tables_are_seed_plus_classified() {
    let log: EventLog = Arc::default();
    let store = MemoryMappings {
        log: log.clone(),
        regions: Mutex::new(Vec::new()),
    };
    let splitter = SiloSplitter::new(
        RecordingExecutor {
            log: log.clone(),
            fail_marker: None,
        },
        "sentry_postgres",
    );

    let run = execute_split(
        &sample_tables(),
        &store,
        &splitter,
        &options("--monolith--", "--monolith--", false),
    )
    .await
    .unwrap();

    let mut expected_control: Vec<String> =
        CONTROL_SEED_TABLES.iter().map(|t| t.to_string()).collect();
    expected_control.extend(["sentry_user".to_string(), "sentry_option".to_string()]);
    let control_dump = &run.control.step(SplitStep::Dump).unwrap().command;
    assert_eq!(table_args(control_dump), expected_control);

    let mut expected_region: Vec<String> =
        REGION_SEED_TABLES.iter().map(|t| t.to_string()).collect();
    expected_region.extend(["sentry_project".to_string(), "sentry_option".to_string()]);
    let region_dump = &run.region.step(SplitStep::Dump).unwrap().command;
    assert_eq!(table_args(region_dump), expected_region);

    // Unassigned tables never reach a dump
    assert!(!control_dump.contains("sentry_mystery"));
    assert!(!region_dump.contains("sentry_mystery"));
}

#[tokio::test]
async fn test_monolith_region_matching_legacy_name_skips_mappings() {
    let log: EventLog = Arc::default();
    let store = MemoryMappings {
        log: log.clone(),
        regions: Mutex::new(vec!["--monolith--".to_string()]),
    };
    let splitter = SiloSplitter::new(
        RecordingExecutor {
            log: log.clone(),
            fail_marker: None,
        },
        "sentry-postgres-1",
    );

    let run = execute_split(
        &sample_tables(),
        &store,
        &splitter,
        &options("--monolith--", "--monolith--", false),
    )
    .await
    .unwrap();

    assert_eq!(run.mappings, MappingRevision::Unchanged);
    let events = log.lock().unwrap().clone();
    assert!(events.iter().all(|e| !e.starts_with("mappings")));
    // 3 control steps + 3 region steps, no reset
    assert_eq!(events.len(), 6);
}

#[tokio::test]
async fn test_failed_steps_do_not_halt_the_driver() {
    let log: EventLog = Arc::default();
    let store = MemoryMappings {
        log: log.clone(),
        regions: Mutex::new(Vec::new()),
    };
    let splitter = SiloSplitter::new(
        RecordingExecutor {
            log: log.clone(),
            fail_marker: Some("pg_dump"),
        },
        "sentry-postgres-1",
    );

    let run = execute_split(
        &sample_tables(),
        &store,
        &splitter,
        &options("us", "old-region", true),
    )
    .await
    .unwrap();

    assert!(!run.is_success());
    assert_eq!(run.control.steps.len(), 5);
    assert_eq!(run.region.steps.len(), 5);
    for report in [&run.control, &run.region] {
        let failed: Vec<SplitStep> = report.failed_steps().map(|s| s.step).collect();
        assert_eq!(failed, vec![SplitStep::Dump]);
        assert!(report.step(SplitStep::Restore).unwrap().success());
    }
}

#[tokio::test]
async fn test_split_from_parsed_manifest() {
    let manifest = parse_manifest(
        r#"
        [settings]
        monolith_region = "us"

        [tables]
        sentry_organizationmapping = ["control"]
        sentry_organization = ["region"]
        "#,
    )
    .unwrap();

    let log: EventLog = Arc::default();
    let store = MemoryMappings {
        log: log.clone(),
        regions: Mutex::new(Vec::new()),
    };
    let splitter = SiloSplitter::new(
        RecordingExecutor {
            log: log.clone(),
            fail_marker: None,
        },
        "sentry-postgres-1",
    );

    let run = execute_split(
        &manifest,
        &store,
        &splitter,
        &options("us", "--monolith--", false),
    )
    .await
    .unwrap();

    assert!(run.tables.control.contains("sentry_organizationmapping"));
    assert!(!run.tables.region.contains("sentry_organizationmapping"));
    assert!(run.tables.region.contains("sentry_organization"));
    assert_eq!(run.mappings.count(), 0);
}
