//! Consolidated call logging against a stdout sink
//! Run with: cargo run --package callscope --example consolidated

use std::sync::Arc;

use async_trait::async_trait;
use callscope::{
    CallLogger, ContextId, ContextStore, ExceptionInfo, FieldMap, RecordSink, RequestInfo,
    ResponseInfo, ScopeConfig, ScopeResult, SerialForwarder, SinkResult, Verbosity,
};

/// Prints each record as one line instead of shipping it to a collector.
struct StdoutSink;

#[async_trait]
impl RecordSink for StdoutSink {
    async fn emit(&self, tag: &str, record: FieldMap, timestamp: Option<i64>) -> SinkResult<()> {
        match timestamp {
            Some(ts) => println!("[{tag} @ {ts}] {}", serde_json::Value::Object(record)),
            None => println!("[{tag}] {}", serde_json::Value::Object(record)),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    callscope::init_tracing(false, tracing::Level::INFO);

    if let Err(e) = run().await {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> ScopeResult<()> {
    let config = ScopeConfig {
        verbosity: Verbosity::Full,
        ..Default::default()
    };
    let forwarder = Arc::new(SerialForwarder::spawn(
        Arc::new(StdoutSink),
        config.forwarder.clone(),
    ));
    let logger = CallLogger::new(
        Arc::new(ContextStore::new()),
        Arc::clone(&forwarder),
        config,
    );

    // A call that completes normally: one record with request + response.
    let cx = ContextId::unique();
    let request = RequestInfo {
        method: "GET".to_string(),
        url: "http://api.example.com/users/42".to_string(),
        ..Default::default()
    };
    logger.log_request(&cx, "users#getUser(String)", &request).await?;
    let response = ResponseInfo {
        status: 200,
        reason: Some("OK".to_string()),
        body: Some(br#"{"id": 42}"#.to_vec()),
        ..Default::default()
    };
    logger
        .log_response(&cx, "users#getUser(String)", &response, 12)
        .await?;

    // A call that fails after two retries: the record carries a numbered
    // retry log next to the exception.
    let cx = ContextId::unique();
    logger.log_retry(&cx, "users#getUser(String)").await?;
    logger.log_retry(&cx, "users#getUser(String)").await?;
    logger
        .log_exception(
            &cx,
            "users#getUser(String)",
            &ExceptionInfo::new("ConnectError", "connection refused"),
            340,
        )
        .await?;

    // A handle reused after an abandoned call: the stale request is
    // quarantined under dirty_context rather than merged into the new call.
    let cx = ContextId::unique();
    let abandoned = RequestInfo {
        method: "DELETE".to_string(),
        url: "http://api.example.com/users/7".to_string(),
        ..Default::default()
    };
    logger
        .log_request(&cx, "users#deleteUser(String)", &abandoned)
        .await?;
    logger.log_request(&cx, "users#getUser(String)", &request).await?;
    logger
        .log_response(&cx, "users#getUser(String)", &response, 9)
        .await?;

    forwarder.shutdown().await;

    let stats = forwarder.stats().snapshot();
    println!(
        "\n✓ {} records submitted, {} emitted",
        stats.submitted, stats.emitted
    );
    Ok(())
}
