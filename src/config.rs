// Command-line and environment configuration.
// Flags for the serve and analyze commands, each with a STATIONTAP_* fallback.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::backend::{DEFAULT_BACKEND_HOST, DEFAULT_BASE_URL};
use crate::pipeline::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

/// Settings for the intercepting proxy.
#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// Address the proxy listens on
    #[arg(short, long, env = "STATIONTAP_LISTEN", default_value = "0.0.0.0:8086")]
    pub listen: SocketAddr,

    /// Directory for collected data
    #[arg(short = 'd', long = "dir", env = "STATIONTAP_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory holding ca.pem and ca.key (defaults to the platform data dir)
    #[arg(long, env = "STATIONTAP_CA_DIR")]
    pub ca_dir: Option<PathBuf>,

    /// Backend host whose TLS traffic is decrypted
    #[arg(long, env = "STATIONTAP_HOST", default_value = DEFAULT_BACKEND_HOST)]
    pub host: String,

    /// Port of the backend host
    #[arg(long, env = "STATIONTAP_PORT", default_value_t = 443)]
    pub port: u16,

    /// Base URL for the statistics endpoints
    #[arg(long, env = "STATIONTAP_BACKEND_URL", default_value = DEFAULT_BASE_URL)]
    pub backend_url: String,

    /// Number of background merge workers
    #[arg(long, env = "STATIONTAP_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Maximum number of observed batches waiting for a worker
    #[arg(long, env = "STATIONTAP_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// AMap key for naming the locality of map queries
    #[arg(long, env = "STATIONTAP_GEOCODE_KEY")]
    pub geocode_key: Option<String>,
}

/// Settings for the ranking report.
#[derive(Debug, Clone, Args)]
pub struct AnalyzeConfig {
    /// Directory with collected data
    #[arg(short = 'd', long = "dir", env = "STATIONTAP_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Locality (city) name to analyze
    #[arg(short = 'c', long, env = "STATIONTAP_LOCALITY", default_value = "成都市")]
    pub locality: String,

    /// Number of models to list per ranking
    #[arg(short = 'n', long, default_value_t = 20)]
    pub top: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        serve: ServeConfig,
    }

    #[test]
    fn test_serve_defaults() {
        let cli = TestCli::try_parse_from(["stationtap"]).unwrap();

        assert_eq!(cli.serve.listen.port(), 8086);
        assert_eq!(cli.serve.host, DEFAULT_BACKEND_HOST);
        assert_eq!(cli.serve.port, 443);
        assert_eq!(cli.serve.workers, DEFAULT_WORKERS);
        assert!(cli.serve.geocode_key.is_none());
    }

    #[test]
    fn test_serve_flags() {
        let cli = TestCli::try_parse_from([
            "stationtap",
            "--listen",
            "127.0.0.1:9000",
            "--dir",
            "/tmp/data",
            "--workers",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.serve.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cli.serve.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(cli.serve.workers, 4);
    }
}
