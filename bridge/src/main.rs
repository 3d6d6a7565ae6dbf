use bridge::config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
struct Cli {
    #[arg(long)]
    config_file_path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config_file_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    if let Some(metrics_config) = &config.metrics {
        match shared::metrics::install_statsd_recorder(
            &metrics_config.statsd_host,
            metrics_config.statsd_port,
            "bridge",
        ) {
            Ok(()) => shared::metrics::describe_all(bridge::metrics_defs::ALL_METRICS),
            Err(err) => tracing::warn!(%err, "failed to install statsd metrics recorder"),
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(bridge::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "bridge exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let default_filter = config
        .logging
        .as_ref()
        .map(|logging| logging.rust_log_default.clone())
        .unwrap_or_else(|| "info".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
