//! Integration tests for the blob logger
//!
//! These tests verify:
//! - End-to-end appends and reads for every representation
//! - Header handling for static and dynamic CSV
//! - Size-based rotation through the facade
//! - Strategy cache reuse
//! - Error prefixes and typed causes
//! - Log injection prevention in traditional lines

use rust_blob_logger::prelude::*;
use rust_blob_logger::{BlobLocation, EMPTY_FILE_MESSAGE, MAX_APPEND_BLOCK_BYTES};
use std::sync::Arc;

fn setup() -> (BlobLogger, MemoryObjectStore, Arc<LocalGrantProvider>) {
    let store = MemoryObjectStore::with_container("logs");
    let grants = Arc::new(LocalGrantProvider::default());
    let logger = BlobLogger::new(Arc::new(store.clone()), grants.clone());
    (logger, store, grants)
}

fn blob_text(store: &MemoryObjectStore, path: &str) -> String {
    let bytes = store.blob_content("logs", path).expect("blob should exist");
    String::from_utf8(bytes.to_vec()).expect("blob should be UTF-8")
}

#[tokio::test]
async fn test_traditional_append_and_read() {
    let (logger, _, _) = setup();
    let entry = log_entry!(LogLevel::Error, "Payment failed", "orderId" => "o-9")
        .with_request_id("req-1")
        .with_user_id("u-7");

    logger
        .append_log("payments", &entry, None)
        .await
        .expect("append should succeed");

    let content = logger.read_logs("payments", None).await.expect("read should succeed");
    assert!(content.contains("[ERROR] [req-1] [User:u-7] Payment failed | Metadata: {\"orderId\":\"o-9\"}"));
    assert!(!content.contains("[Session:"));
}

#[tokio::test]
async fn test_log_injection_prevention() {
    let (logger, store, _) = setup();
    let malicious = "User login\nERROR [2024-10-17] Fake error injected\rINFO Continuation";

    logger
        .append_log("security", &LogEntry::new(LogLevel::Info, malicious), None)
        .await
        .expect("append should succeed");

    let content = blob_text(&store, "application/security.log");
    assert_eq!(content.lines().count(), 1, "entry should stay on one line");
    assert!(content.contains("User login\\nERROR"));
}

#[tokio::test]
async fn test_csv_static_header_written_once() {
    let (logger, store, _) = setup();

    for i in 0..3 {
        let entry = LogEntry::new(LogLevel::Info, format!("row {}", i));
        logger
            .append_log("audit.csv", &entry, None)
            .await
            .expect("append should succeed");
    }

    let content = blob_text(&store, "application/audit.csv");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "timestamp,level,requestId,userId,sessionId,message,metadata");
    assert!(lines[3].contains(",row 2,"));
}

#[tokio::test]
async fn test_csv_dynamic_columns() {
    let (logger, store, _) = setup();
    let config = LogFileConfig::new()
        .with_file_type(FileType::Csv)
        .with_dynamic_columns(true);

    let batch = vec![
        bulk_entry!(LogLevel::Info, "t1", "account" => "a-1", "amount" => 10, "memo" => "rent, june"),
        bulk_entry!(LogLevel::Info, "t2", "amount" => 20, "account" => "a-2"),
        bulk_entry!(LogLevel::Warn, "no metadata here"),
    ];
    logger
        .append_bulk_logs("ledger", &batch, Some(&config))
        .await
        .expect("bulk append should succeed");

    let content = blob_text(&store, "application/ledger.csv");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "account,amount,memo");
    assert_eq!(lines[1], "a-1,10,\"rent, june\"");
    assert_eq!(lines[2], "a-2,20,");
    assert!(lines[3].contains(",WARN,,,,no metadata here,"));
}

#[tokio::test]
async fn test_bulk_preserves_order_and_timestamps() {
    let (logger, store, _) = setup();
    let base = chrono::Utc::now() - chrono::Duration::hours(1);
    let batch: Vec<BulkLogEntry> = (0..5)
        .map(|i| bulk_entry!(at base + chrono::Duration::seconds(i); LogLevel::Debug, format!("step {}", i)))
        .collect();

    logger
        .append_bulk_logs("steps", &batch, None)
        .await
        .expect("bulk append should succeed");

    let content = blob_text(&store, "application/steps.log");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 5);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!("step {}", i)));
    }
    assert_eq!(store.append_sizes("logs", "application/steps.log").len(), 1);
}

#[tokio::test]
async fn test_bulk_larger_than_ceiling_is_chunked() {
    let (logger, store, _) = setup();
    let message = "m".repeat(64 * 1024);
    let batch: Vec<BulkLogEntry> = (0..80)
        .map(|_| BulkLogEntry::new(LogEntry::new(LogLevel::Info, message.clone())))
        .collect();

    logger
        .append_bulk_logs("large", &batch, None)
        .await
        .expect("bulk append should succeed");

    let sizes = store.append_sizes("logs", "application/large.log");
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0], MAX_APPEND_BLOCK_BYTES);
    assert_eq!(
        sizes.iter().sum::<usize>(),
        blob_text(&store, "application/large.log").len()
    );
}

#[tokio::test]
async fn test_oversized_single_entry_rejected() {
    let (logger, store, _) = setup();
    let entry = LogEntry::new(LogLevel::Info, "z".repeat(MAX_APPEND_BLOCK_BYTES));

    let err = logger
        .append_log("huge", &entry, None)
        .await
        .expect_err("entry above the ceiling must fail");
    assert!(err.to_string().starts_with("Failed to append log: Entry too large"));
    assert!(matches!(err.root(), LoggerError::EntryTooLarge { .. }));
    assert!(store.append_sizes("logs", "application/huge.log").is_empty());
}

#[tokio::test]
async fn test_xlsx_round_trip() {
    let (logger, store, _) = setup();
    let entries = [
        log_entry!(LogLevel::Info, "Report generated", "rows" => 120),
        log_entry!(LogLevel::Warn, "Report late, retrying"),
    ];
    for entry in &entries {
        logger
            .append_log("report.xlsx", entry, None)
            .await
            .expect("append should succeed");
    }

    assert_eq!(store.upload_count("logs", "application/report.xlsx"), 3);

    let content = logger.read_logs("report.xlsx", None).await.expect("read should succeed");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "Timestamp,Level,Request ID,User ID,Session ID,Message,Metadata"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Report generated"));
    assert!(lines[2].contains("\"Report late, retrying\""));

    // A fresh logger loads the existing rows before writing
    let second = BlobLogger::new(Arc::new(store.clone()), Arc::new(LocalGrantProvider::default()));
    second
        .append_log("report.xlsx", &LogEntry::new(LogLevel::Debug, "third"), None)
        .await
        .expect("append should succeed");
    let content = second.read_logs("report.xlsx", None).await.expect("read should succeed");
    assert_eq!(content.lines().count(), 4);
}

#[tokio::test]
async fn test_xlsx_dynamic_columns_title_case() {
    let (logger, _, _) = setup();
    let config = LogFileConfig::new().with_dynamic_columns(true);
    let entry = log_entry!(LogLevel::Info, "transfer", "source_account" => "a", "targetAccount" => "b");

    logger
        .append_log("transfers.xlsx", &entry, Some(&config))
        .await
        .expect("append should succeed");

    let content = logger
        .read_logs("transfers.xlsx", Some(&config))
        .await
        .expect("read should succeed");
    assert_eq!(content, "Source Account,Target Account\na,b\n");
}

#[tokio::test]
async fn test_rotation_through_facade() {
    let (logger, store, _) = setup();
    let config = LogFileConfig::new().with_max_file_size_mb(1);
    let filler = LogEntry::new(LogLevel::Info, "f".repeat(1024 * 1024));

    logger
        .append_log("rotating", &filler, Some(&config))
        .await
        .expect("append should succeed");
    logger
        .append_log("rotating", &LogEntry::new(LogLevel::Info, "fresh"), Some(&config))
        .await
        .expect("append should succeed");

    let paths = store.blob_paths("logs");
    assert_eq!(paths.len(), 2);
    let rotated = paths
        .iter()
        .find(|p| p.starts_with("application/rotating-rotated-"))
        .expect("rotated sibling should exist");
    assert!(rotated.ends_with(".log"));
    assert!(blob_text(&store, rotated).contains("fresh"));
    assert!(!blob_text(&store, "application/rotating.log").contains("fresh"));
    assert_eq!(logger.metrics().rotations(), 1);

    // Subsequent writes keep going to the rotated blob
    logger
        .append_log("rotating", &LogEntry::new(LogLevel::Info, "later"), Some(&config))
        .await
        .expect("append should succeed");
    assert!(blob_text(&store, rotated).contains("later"));
}

#[tokio::test]
async fn test_read_and_stats_states() {
    let (logger, store, _) = setup();

    let stats = logger
        .get_log_file_stats("empty.csv", None)
        .await
        .expect("stats should succeed");
    assert!(!stats.exists);
    assert_eq!(stats.file_type, FileType::Csv);
    assert!(stats.size_bytes.is_none());

    let err = logger.read_logs("empty.csv", None).await.expect_err("missing blob");
    assert!(err.to_string().starts_with("Failed to read logs: "));
    assert!(matches!(err.root(), LoggerError::NotFound { .. }));
    assert!(store.blob_paths("logs").is_empty(), "reads must not create blobs");

    store.put_blob("logs", "application/blank.log", "  \n ");
    let content = logger.read_logs("blank", None).await.expect("read should succeed");
    assert_eq!(content, EMPTY_FILE_MESSAGE);

    logger
        .append_log("empty.csv", &LogEntry::new(LogLevel::Info, "now present"), None)
        .await
        .expect("append should succeed");
    let stats = logger
        .get_log_file_stats("empty.csv", None)
        .await
        .expect("stats should succeed");
    assert!(stats.exists);
    assert!(stats.size_bytes.unwrap_or_default() > 0);
    assert!(stats.created_at.is_some());
}

#[tokio::test]
async fn test_stats_survive_property_lookup_failure() {
    let (logger, store, _) = setup();
    logger
        .append_log("flaky.csv", &LogEntry::new(LogLevel::Info, "before"), None)
        .await
        .expect("append should succeed");

    store.set_probe_failure(true);
    let stats = logger
        .get_log_file_stats("flaky.csv", None)
        .await
        .expect("stats must not fail when the lookup fails");
    assert!(!stats.exists);
    assert_eq!(stats.file_type, FileType::Csv);
    assert!(stats.size_bytes.is_none());
    assert!(stats.size_mb.is_none());

    logger
        .append_log("flaky.csv", &LogEntry::new(LogLevel::Info, "after"), None)
        .await
        .expect("append should not depend on the lookup");
    assert_eq!(logger.metrics().failed_operations(), 0);

    store.set_probe_failure(false);
    let content = blob_text(&store, "application/flaky.csv");
    assert_eq!(content.lines().count(), 3);
    let last = content.lines().last().expect("rows should be present");
    assert!(last.contains(",after,"));
}

#[tokio::test]
async fn test_xlsx_colliding_columns_and_typed_cells() {
    let (logger, _, _) = setup();
    let config = LogFileConfig::new().with_dynamic_columns(true);
    let entry = log_entry!(
        LogLevel::Info,
        "signup",
        "user_id" => "u-1",
        "userId" => "u-2",
        "attempts" => 3,
        "verified" => true
    );

    logger
        .append_log("signups.xlsx", &entry, Some(&config))
        .await
        .expect("append should succeed");

    let content = logger
        .read_logs("signups.xlsx", Some(&config))
        .await
        .expect("read should succeed");
    assert_eq!(content, "User Id,User Id 2,Attempts,Verified\nu-1,u-2,3,true\n");
}

#[tokio::test]
async fn test_cache_reuse_counts() {
    let (logger, _, grants) = setup();
    let entry = LogEntry::new(LogLevel::Info, "cached");
    let config = LogFileConfig::new().with_directory("services/orders");

    logger.append_log("orders", &entry, Some(&config)).await.expect("append");
    logger.append_log("orders", &entry, Some(&config.clone())).await.expect("append");
    assert_eq!(logger.metrics().strategies_built(), 1);
    assert_eq!(grants.issued_count(), 1);

    logger.clear_strategy_cache();
    logger.append_log("orders", &entry, Some(&config)).await.expect("append");
    assert_eq!(logger.metrics().strategies_built(), 2);
    assert_eq!(grants.issued_count(), 2);
}

#[tokio::test]
async fn test_access_errors_surface() {
    let (logger, _, grants) = setup();
    grants.set_deny(true);

    let err = logger
        .append_log("app", &LogEntry::new(LogLevel::Info, "denied"), None)
        .await
        .expect_err("grant refusal must fail");
    assert!(matches!(err.root(), LoggerError::Access { .. }));
    assert!(err.root().is_permanent());
}

#[tokio::test]
async fn test_transient_failures_are_generic() {
    let (logger, store, _) = setup();
    logger
        .append_log("app", &LogEntry::new(LogLevel::Info, "ok"), None)
        .await
        .expect("append should succeed");

    store.set_offline(true);
    let err = logger
        .append_log("app", &LogEntry::new(LogLevel::Info, "lost"), None)
        .await
        .expect_err("offline backend must fail");
    assert!(matches!(err.root(), LoggerError::Storage(_)));
    assert!(!err.root().is_permanent());
}

#[tokio::test]
async fn test_missing_container_is_distinguished() {
    let store = MemoryObjectStore::new();
    let logger = BlobLogger::new(Arc::new(store), Arc::new(LocalGrantProvider::default()));

    let err = logger
        .append_log("app", &LogEntry::new(LogLevel::Info, "x"), None)
        .await
        .expect_err("missing container must fail");
    assert_eq!(
        err.to_string(),
        "Failed to append log: Container 'logs' does not exist"
    );
}

#[tokio::test]
async fn test_custom_location() {
    let (logger, store, _) = setup();
    store.create_container("audit");
    let config = LogFileConfig::new()
        .with_container("audit")
        .with_directory("/teams/risk/");

    logger
        .append_log("decisions.log", &LogEntry::new(LogLevel::Info, "approved"), Some(&config))
        .await
        .expect("append should succeed");

    let location = BlobLocation::new("audit", "/teams/risk/", "decisions.log", ".log");
    assert_eq!(location.blob_path(), "teams/risk/decisions.log");
    assert!(store.blob_content("audit", &location.blob_path()).is_some());
}

#[test]
fn test_supported_formats() {
    let formats = BlobLogger::get_supported_formats();
    let summary: Vec<(FileType, &str, bool)> = formats
        .iter()
        .map(|f| (f.file_type, f.extension.as_str(), f.supports_append))
        .collect();
    assert_eq!(
        summary,
        vec![
            (FileType::Log, ".log", true),
            (FileType::Csv, ".csv", true),
            (FileType::Xlsx, ".xlsx", false),
        ]
    );
    assert!(formats.iter().all(|f| !f.description.is_empty()));
}

#[test]
fn test_overrides_resolve_after_validation() {
    let overrides: LoggingConfigOverrides = serde_json::from_str(
        r#"{"containerName":"logs","directory":"jobs","maxFileSize":5,"fileType":"CSV","dynamicColumns":true}"#,
    )
    .expect("overrides should deserialize");

    let report = BlobLogger::validate_logging_config(&overrides);
    assert!(report.is_valid, "{:?}", report.errors);

    let config = overrides.into_config().expect("valid overrides resolve");
    assert_eq!(config.file_type, Some(FileType::Csv));
    assert_eq!(config.max_file_size_bytes(), 5 * 1024 * 1024);
    assert!(config.dynamic_columns);
}
