use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

use connect_api::transform::Transformation;
use connect_engine::config::PipelineConfig;
use connect_engine::error::EngineError;
use connect_engine::pipeline::Pipeline;
use connect_engine::registry::TransformRegistry;
use connect_transform_full_name::FullNameTransform;

#[derive(Parser)]
#[command(
    name = "connect-transform",
    about = "Apply record transforms to newline-delimited JSON records"
)]
struct Cli {
    /// Path to TOML pipeline configuration. Without it, only the full-name
    /// transform runs.
    #[arg(long, env = "CONNECT_TRANSFORM_CONFIG")]
    config: Option<String>,

    /// Read records from this file instead of stdin.
    #[arg(long)]
    input: Option<String>,
}

fn builtin_registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register("full-name", || {
        Box::new(FullNameTransform::new()) as Box<dyn Transformation>
    });
    registry
}

/// Process every non-blank line of `input`, writing results to stdout.
async fn run<R: AsyncBufRead + Unpin>(
    pipeline: &mut Pipeline,
    input: R,
) -> Result<(), EngineError> {
    let mut lines = input.lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(out) = pipeline.process_line(&line)? {
            stdout.write_all(out.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
    }
    stdout.flush().await?;
    Ok(())
}

/// Run until EOF or Ctrl+C.
async fn drive<R: AsyncBufRead + Unpin>(
    pipeline: &mut Pipeline,
    input: R,
) -> Result<(), EngineError> {
    tokio::select! {
        res = run(pipeline, input) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down...");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries records only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path, "loading configuration");
            match PipelineConfig::load(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load config");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::info!("no configuration given, running full-name transform only");
            PipelineConfig::full_name_only()
        }
    };

    tracing::info!(transforms = config.transforms.len(), "bootstrapping pipeline");
    let mut pipeline = match Pipeline::bootstrap(&config, &builtin_registry()) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to bootstrap pipeline");
            std::process::exit(1);
        }
    };

    let result = match &cli.input {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => drive(&mut pipeline, BufReader::new(file)).await,
            Err(e) => {
                tracing::error!(input = %path, error = %e, "failed to open input");
                Err(EngineError::Io(e))
            }
        },
        None => drive(&mut pipeline, BufReader::new(tokio::io::stdin())).await,
    };

    let mut failed = false;
    if let Err(e) = result {
        tracing::error!(error = %e, "pipeline failed");
        failed = true;
    }
    if let Err(e) = pipeline.shutdown() {
        tracing::error!(error = %e, "failed to shut down pipeline");
        failed = true;
    }
    if failed {
        std::process::exit(1);
    }
}
