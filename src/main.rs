mod clock;
mod config;
mod error;
mod http_server;
mod logging;
mod ports;
mod request_parameters;
mod rss;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    http_server::{app::HttpServerConfig, state::AppState},
    logging::init_tracing,
    ports::http::HttpTransport,
    services::{
        ard::{ArdFeedBuilder, api::ArdApi},
        cache::FeedCache,
        cached_feed::CachedFeed,
        transport::ReqwestTransport,
        zdf::ZdfFeedBuilder,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MEDIATHEK2RSS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "mediathek2rss=debug"
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP gRPC endpoint to export traces to
    #[arg(long, global = true, env = "OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve RSS feeds over HTTP (default)
    Serve {
        /// The port to run the server on, overrides the config file
        #[arg(short, long, env = "MEDIATHEK2RSS_PORT")]
        port: Option<u16>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn app_state(config: &Config) -> Result<AppState> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
        config.request_timeout()?,
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache_duration = TimeDelta::from_std(config.cache_duration()?)
        .wrap_err("cache_duration is too large")?;
    let cache = Arc::new(FeedCache::with_clock(cache_duration, clock.clone()));

    let ard = ArdFeedBuilder::new(
        ArdApi::new(config.max_episodes, transport.clone()),
        clock.clone(),
    );
    let zdf = ZdfFeedBuilder::new(config.max_episodes, transport, clock);

    Ok(AppState {
        ard: CachedFeed::new("ard", cache.clone(), Arc::new(ard)),
        zdf: CachedFeed::new("zdf", cache, Arc::new(zdf)),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        "mediathek2rss",
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Config(ConfigCommands::CreateDefault) => {
            let path = Config::create_default()?;
            tracing::info!(path = %path.display(), "Default config created");
        }
        Commands::Config(ConfigCommands::Path) => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
        Commands::Serve { port } => {
            let config = Config::load(args.config.as_deref())
                .wrap_err("Failed to load mediathek2rss config")?;
            tracing::debug!(?config, "Loaded configuration");

            http_server::app::start(HttpServerConfig {
                port: port.unwrap_or(config.port),
                app_state: app_state(&config)?,
            })
            .await?;
        }
    }

    if let Some(tracer_provider) = tracer_provider {
        tracer_provider
            .shutdown()
            .wrap_err("Failed to shut down tracer provider")?;
    }

    Ok(())
}
