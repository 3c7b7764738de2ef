use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};

use gpu_meminfo::config::{Cli, Config, OutputFormat};
use gpu_meminfo::gpu::memory::{default_provider, MemoryInfoProvider, StatusReport};

fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging. Logs go to stderr so stdout stays parseable.
    let filter = if cli.verbose {
        "gpu_meminfo=debug"
    } else {
        "gpu_meminfo=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("gpu-meminfo v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)?.with_overrides(&cli);

    let result = default_provider().query(config.device_id);
    let report = StatusReport::from_result(config.device_id, &result);

    match config.format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        info!(status = report.status, "GPU memory unavailable");
        Ok(ExitCode::FAILURE)
    }
}
