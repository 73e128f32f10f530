// stationtap command-line entry point.
// Dispatches to the intercepting proxy or the locality ranking report.

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use stationtap::analyze::LocalityAnalyzer;
use stationtap::config::{AnalyzeConfig, ServeConfig};
use stationtap::server;

#[derive(Parser)]
#[command(name = "stationtap")]
#[command(about = "Collect station order data through a proxy and rank popular vehicle models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STATIONTAP_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the intercepting proxy and collect station data
    #[command(alias = "collect_data")]
    Serve(ServeConfig),

    /// Rank vehicle models from collected data for one locality
    #[command(alias = "analysis")]
    Analyze(AnalyzeConfig),
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Serve(config) => server::run(config).await?,
        Commands::Analyze(config) => {
            let analyzer = LocalityAnalyzer::open(&config.data_dir, &config.locality)?;
            println!("Locality: {}", analyzer.locality());
            if let Some(paid_at) = analyzer.latest_payment() {
                println!("Latest payment: {}", paid_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!();
            print!("{}", analyzer.report().render(config.top));
        }
    }

    Ok(())
}
