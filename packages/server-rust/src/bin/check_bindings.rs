//! Validates a binding configuration against the built-in interceptors and
//! prints the resolved chain for every handler.
//!
//! With `--probe <handler>`, also dispatches one request through that
//! handler's chain to an echo handler and prints the outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use intercept_core::RequestContext;
use intercept_server::{builtin_registry, BindingConfig, ChainBuilder, DispatchConfig, Dispatcher};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "check-bindings")]
#[command(about = "Validate handler-to-interceptor bindings", long_about = None)]
struct Cli {
    /// Binding configuration file (JSON)
    #[arg(short, long, env = "INTERCEPT_BINDINGS")]
    bindings: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Log level used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dispatch one request through this handler's chain
    #[arg(long)]
    probe: Option<String>,

    /// Metadata for the probe request, as `key=value`
    #[arg(long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,
}

fn init_logging(format: LogFormat, level: &str) -> Result<()> {
    let level: tracing::Level = level.parse().context("invalid log level")?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
    Ok(())
}

fn probe_context(handler: &str, headers: &[String]) -> Result<RequestContext> {
    let mut ctx = RequestContext::new(handler);
    for header in headers {
        let (key, value) = header
            .split_once('=')
            .with_context(|| format!("header must be KEY=VALUE: {header}"))?;
        ctx = ctx.with_metadata(key.trim(), value.trim());
    }
    Ok(ctx)
}

fn echo(ctx: RequestContext) -> Result<Value, intercept_core::ChainError> {
    Ok(json!({
        "handler": ctx.handler,
        "trace_id": ctx.trace_id,
        "principal": ctx.principal.map(|p| p.id),
        "scratch": ctx.scratch,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    let bindings = BindingConfig::load(&cli.bindings)
        .with_context(|| format!("failed to load {}", cli.bindings.display()))?;
    let registry = builtin_registry()?;
    let chains = ChainBuilder::new(&registry, &bindings).map_err(|err| {
        tracing::warn!(error = %err, "binding configuration rejected");
        err
    })?;

    for handler in chains.handlers() {
        let chain = chains.chain_for(handler);
        println!("{handler}: [{}]", chain.ids().join(", "));
    }

    if let Some(handler) = cli.probe {
        let ctx = probe_context(&handler, &cli.headers)?;
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), chains);
        dispatcher.register(handler, echo);

        let outcome = dispatcher.oneshot(ctx).await?;
        println!("probe {:?}: {}", outcome.state, outcome.result.unwrap_or(Value::Null));
    }
    Ok(())
}
