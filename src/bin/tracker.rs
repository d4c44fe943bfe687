use chrono::Utc;
use clap::Parser;
use follower_tracker::config::Config;
use follower_tracker::fetcher::FollowerFetcher;
use follower_tracker::storage;
use follower_tracker::tracker::Tracker;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Env file to load configuration from (defaults to ./.env if present)
    #[arg(short, long)]
    env_file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![(
        "follower_tracker",
        LevelFilter::TRACE,
    )]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path)?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let config = Config::from_env()?;
    info!("follower tracker starting for @{}", config.username);

    let backend = storage::create_backend(&config.storage).await?;
    let fetcher = FollowerFetcher::new(&config.bearer_token, &config.username);
    let tracker = Tracker::new(backend, fetcher);

    let summary = tracker.run(Utc::now().date_naive()).await?;

    info!(
        "tracking completed successfully: {} -> {} followers",
        summary.previous, summary.record.followers
    );

    Ok(())
}
