use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use code_loader_lambda::adapters::object_store::CodeStore;
use code_loader_lambda::config::LoaderConfig;
use code_loader_lambda::handlers::loader::{handle_invocation_with_js_runtime, resolve_config};
use code_loader_lambda::runtime::contract::InvocationContext;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct S3CodeStore {
    s3_client: aws_sdk_s3::Client,
}

impl CodeStore for S3CodeStore {
    fn download_object(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), String> {
        let source_bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        let body = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(source_bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| {
                        format!(
                            "failed to download object from s3: {}",
                            DisplayErrorContext(&error)
                        )
                    })?;
                output
                    .body
                    .collect()
                    .await
                    .map(|data| data.into_bytes())
                    .map_err(|error| format!("failed to read s3 object body: {error}"))
            })
        })?;

        std::fs::write(destination, &body).map_err(|error| {
            format!(
                "failed to write downloaded code to {}: {error}",
                destination.display()
            )
        })
    }
}

fn invocation_context(context: &lambda_runtime::Context) -> InvocationContext {
    let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    InvocationContext {
        aws_request_id: context.request_id.clone(),
        function_name: context.env_config.function_name.clone(),
        function_version: context.env_config.version.clone(),
        memory_limit_in_mb: context.env_config.memory,
        invoked_function_arn: context.invoked_function_arn.clone(),
        log_group_name: context.env_config.log_group.clone(),
        log_stream_name: context.env_config.log_stream.clone(),
        deadline_ms: context.deadline,
        remaining_time_in_millis: context.deadline.saturating_sub(now_ms),
        xray_trace_id: context.xray_trace_id.clone(),
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = resolve_config(LoaderConfig::from_env());
    let context = serde_json::to_value(invocation_context(&event.context)).unwrap_or_default();

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3CodeStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };

    Ok(handle_invocation_with_js_runtime(
        &event.payload,
        &context,
        &config,
        &store,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
