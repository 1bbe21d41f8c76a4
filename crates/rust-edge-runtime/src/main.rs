//! Rust Edge Runtime - bootstrap binary
//!
//! Loads configuration from the environment, connects to the runtime API and
//! serves invocations with one of the built-in handlers until the control plane
//! stops answering.
//!
//! The runtime owns its own worker pool, so `main` stays synchronous.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use rust_edge_runtime::sdk::prelude::*;
use rust_edge_runtime::{HandlerRegistry, HttpClient, Runner, RuntimeApiClient, RuntimeConfig, Transport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct HelloRequest {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct HelloResponse {
    message: String,
    request_id: String,
}

fn builtin_handlers() -> Result<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();

    registry.register(
        "echo",
        HandlerAdapter::untyped_deferred(|event: JsonObject, _| async move { Ok(event) }),
    )?;

    registry.register(
        "hello",
        HandlerAdapter::typed_deferred(|request: HelloRequest, context: Context| async move {
            let name = request.name.unwrap_or_else(|| "World".to_string());
            Ok(HelloResponse {
                message: format!("Hello, {}!", name),
                request_id: context.request_id,
            })
        }),
    )?;

    Ok(registry)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,rust_edge_runtime=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rust Edge Runtime");

    // Load configuration
    let config = RuntimeConfig::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    let runtime_api = config
        .runtime_api
        .clone()
        .context("AWS_LAMBDA_RUNTIME_API is not set")?;
    let handler = config.handler.clone().context("_HANDLER is not set")?;

    let transport = Arc::new(Transport::create(config.transport())?);
    let api = RuntimeApiClient::new(&runtime_api, transport.clone())?;

    let environment: HashMap<String, String> = env::vars().collect();
    let runner = Runner::new(api, builtin_handlers()?, handler, environment);

    let result = runner.run();

    drop(runner);
    if let Err(err) = transport.shutdown() {
        tracing::warn!(error = %err, "Transport shutdown failed");
    }

    result?;
    Ok(())
}
