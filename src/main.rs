use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use whoisbot::cli::Cli;
use whoisbot::config::Config;
use whoisbot::errors::Result;
use whoisbot::{
    JsonLinesFeed, JsonLinesSink, LookupOrchestrator, RdapProvider, RecordFormatter, RunStats,
    WhoisBot, WhoisProvider, logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_args();
    logging::init(cli.verbose);

    match run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.verbose > 0 {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunStats> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = Config::from_env();
    config.merge_with_cli(cli)?;
    config.validate()?;

    let primary = Arc::new(WhoisProvider::from_config(&config.lookup));
    let secondary = Arc::new(RdapProvider::from_config(&config.lookup)?);
    let orchestrator = LookupOrchestrator::from_config(primary, secondary, &config.lookup);
    let formatter = RecordFormatter::from_config(&config.output);
    let bot = WhoisBot::new(config, orchestrator, formatter, JsonLinesSink::stdout());

    info!(version = whoisbot::VERSION, "watching comment feed");

    let stats = match cli.input {
        Some(ref path) => bot.run(&mut JsonLinesFeed::open(path).await?).await,
        None => bot.run(&mut JsonLinesFeed::stdin()).await,
    };

    info!(
        seen = stats.seen,
        replied = stats.replied,
        ignored = stats.ignored,
        dropped = stats.dropped,
        malformed = stats.malformed,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "feed exhausted"
    );
    Ok(stats)
}
