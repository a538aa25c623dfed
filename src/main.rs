use clap::Parser;
use tracing_subscriber::EnvFilter;

use countdown_bot::config::Config;
use countdown_bot::daemon;
use countdown_bot::error::Result;

#[derive(Parser, Debug)]
#[command(name = "countdown-bot")]
#[command(about = "Countdown reminder bot daemon")]
struct Cli {
    #[arg(long, help = "Path to a JSON config file")]
    config: Option<String>,

    #[arg(long, env = "COUNTDOWN_BOT_DATA", help = "Path to the schedule backing file")]
    data: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,countdown_bot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let data_path = cli
        .data
        .clone()
        .unwrap_or_else(|| config.data_path().to_string());
    let host = cli.host.clone().unwrap_or_else(|| config.host().to_string());
    let port = cli.port.unwrap_or_else(|| config.port());

    daemon::run(&host, port, &data_path).await
}
