//! CLI module for elastic-cpu-exporter
//!
//! Parses command-line flags into a validated `ExporterConfig`.

use clap::Parser;
use elastic_cpu_exporter_common::{config::ExporterConfig, error::CommonResult};

/// Prometheus exporter for Elasticsearch node CPU cgroup stats
#[derive(Parser, Debug)]
#[command(name = "elastic-cpu-exporter")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    ELASTIC_EXPORTER_ENDPOINT    Elasticsearch endpoint (same as --endpoint)
    ELASTIC_EXPORTER_INTERVAL    Seconds between checks (default: 60)
    ELASTIC_EXPORTER_PORT        Listen port (default: 9210)
    ELASTIC_EXPORTER_LOG_LEVEL   Log level filter, overrides --verbose
"#)]
pub struct Cli {
    /// HTTP endpoint of the Elasticsearch cluster to monitor
    #[arg(long, env = "ELASTIC_EXPORTER_ENDPOINT")]
    pub endpoint: String,

    /// Time interval in seconds between Elasticsearch checks
    #[arg(long, default_value_t = 60, env = "ELASTIC_EXPORTER_INTERVAL")]
    pub interval: u64,

    /// Listening port of the exporter
    #[arg(long, default_value_t = 9210, env = "ELASTIC_EXPORTER_PORT")]
    pub port: u16,

    /// Listening address of the exporter
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Set log level to DEBUG (much more logs)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Convert flags into a validated configuration
    pub fn into_config(self) -> CommonResult<ExporterConfig> {
        let mut config = ExporterConfig::new(self.endpoint);
        config.interval_secs = self.interval;
        config.port = self.port;
        config.host = self.host;
        config.verbose = self.verbose;
        config.validate()
    }
}
