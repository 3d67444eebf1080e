use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde_json::{json, Value};

use crate::adapters::js_runtime::BoaRuntime;
use crate::adapters::object_store::CodeStore;
use crate::config::LoaderConfig;
use crate::runtime::contract::{locate_reference, source_fingerprint, CodeLocation, HANDLER_BINDING};
use crate::runtime::error::LoaderError;
use crate::runtime::namespace::{CodeRuntime, ExecutionNamespace};

/// Runs one invocation: locate the code reference, fetch it, load it and
/// delegate to its `handler`. Never fails; every error becomes
/// `{"error": message}`.
pub fn handle_invocation(
    event: &Value,
    context: &Value,
    scratch_path: &Path,
    store: &impl CodeStore,
    runtime: &impl CodeRuntime,
) -> Value {
    let started_at = Instant::now();

    match run_invocation(event, context, scratch_path, store, runtime) {
        Ok(result) => {
            log_loader_info(
                "handler_completed",
                json!({ "duration_ms": started_at.elapsed().as_millis() }),
            );
            result
        }
        Err(error) => {
            log_loader_error(
                "invocation_failed",
                json!({
                    "kind": error.kind().as_str(),
                    "message": error.message(),
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            error.to_response()
        }
    }
}

/// Falls back to the default configuration when the environment is invalid,
/// so a bad setting never masks the invocation's own result.
pub fn resolve_config(loaded: Result<LoaderConfig, String>) -> LoaderConfig {
    loaded.unwrap_or_else(|message| {
        log_loader_error(
            "config_invalid",
            json!({ "message": message, "fallback": "defaults" }),
        );
        LoaderConfig::default()
    })
}

pub fn handle_invocation_with_js_runtime(
    event: &Value,
    context: &Value,
    config: &LoaderConfig,
    store: &impl CodeStore,
) -> Value {
    handle_invocation(
        event,
        context,
        &config.scratch_path,
        store,
        &BoaRuntime::new(config.capture_console),
    )
}

fn run_invocation(
    event: &Value,
    context: &Value,
    scratch_path: &Path,
    store: &impl CodeStore,
    runtime: &impl CodeRuntime,
) -> Result<Value, LoaderError> {
    let location = locate_reference(event)?;
    log_loader_info(
        "invocation_started",
        json!({ "bucket": location.bucket.clone(), "key": location.key.clone() }),
    );

    let source = fetch_source(&location, scratch_path, store)?;

    let mut namespace = ExecutionNamespace::new();
    let loaded = runtime.load(&source, &mut namespace);
    if let Err(message) = loaded {
        forward_console(&namespace);
        return Err(LoaderError::load(message));
    }
    let bindings: BTreeMap<&str, &str> = namespace
        .iter()
        .map(|(name, binding)| (name, binding.type_name()))
        .collect();
    log_loader_info("source_loaded", json!({ "bindings": bindings }));

    let Some(handler) = namespace.callable(HANDLER_BINDING) else {
        forward_console(&namespace);
        return Err(LoaderError::missing_entry_point());
    };

    let result = handler.call(event, context);
    forward_console(&namespace);
    result.map_err(LoaderError::handler)
}

fn fetch_source(
    location: &CodeLocation,
    scratch_path: &Path,
    store: &impl CodeStore,
) -> Result<String, LoaderError> {
    store
        .download_object(&location.bucket, &location.key, scratch_path)
        .map_err(LoaderError::retrieval)?;

    let source = fs::read_to_string(scratch_path).map_err(|error| {
        LoaderError::retrieval(format!(
            "failed to read downloaded code at {}: {error}",
            scratch_path.display()
        ))
    })?;

    log_loader_info(
        "source_fetched",
        json!({
            "bucket": location.bucket.clone(),
            "key": location.key.clone(),
            "bytes": source.len(),
            "sha256": source_fingerprint(&source),
        }),
    );
    Ok(source)
}

fn forward_console(namespace: &ExecutionNamespace) {
    for line in namespace.drain_console() {
        log_loader_info("loaded_code_console", json!({ "message": line }));
    }
}

fn log_loader_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "code_loader",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_loader_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "code_loader",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
