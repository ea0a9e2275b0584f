//! Elastic CPU Exporter Entry Point

use clap::Parser;
use elastic_cpu_exporter::{cli::Cli, logging, server, ExporterContext};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = logging::init(verbose) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Prometheus Elastic CPU Exporter v{}", env!("CARGO_PKG_VERSION"));
    info!("Elasticsearch endpoint: {}", config.endpoint);
    info!("Interval between Elasticsearch calls: {}s", config.interval_secs);

    let context = match ExporterContext::new(config) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to initialize exporter: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Initialization done");

    let listener = match server::bind(&context.config.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let scheduler = context.scheduler();
    let shutdown = scheduler.cancellation_token();
    let mut server_task = tokio::spawn(server::serve(
        listener,
        context.registry.clone(),
        shutdown.clone(),
    ));
    let scheduler_task = scheduler.start();

    // 通常運用ではシグナル受信までループは止まらない
    let finished = tokio::select! {
        signal = wait_for_shutdown() => {
            info!("Shutdown signal received ({})", signal);
            None
        }
        result = &mut server_task => Some(result),
    };
    shutdown.cancel();
    let server_result = match finished {
        Some(result) => result,
        None => server_task.await,
    };
    let scheduler_ok = match scheduler_task.await {
        Ok(_) => true,
        Err(e) => {
            error!("Scheduler task panicked: {}", e);
            false
        }
    };

    match server_result {
        Ok(Ok(())) if scheduler_ok => ExitCode::SUCCESS,
        Ok(Ok(())) => ExitCode::FAILURE,
        Ok(Err(e)) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Server task panicked: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn wait_for_shutdown() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    "ctrl-c"
}
