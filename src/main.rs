use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod extract;
mod fetch;
mod preview;
mod render;
mod service;
mod store;
mod styles;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use fetch::HttpFetcher;
use service::PreviewService;
use store::MemoryStore;
use styles::StyleStore;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let mut config = Config::load_with(&args.config);

    match args.command {
        cli::Command::Daemon { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            web::start_daemon(config);
            Ok(())
        }

        cli::Command::Preview { url } => {
            let store = Arc::new(MemoryStore::new());
            let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone()));
            let service = PreviewService::new(store, fetcher);

            let preview = service.get_or_fetch(&url, false)?;
            println!("{}", serde_json::to_string_pretty(&preview).unwrap());
            Ok(())
        }

        cli::Command::Styles {} => {
            let store = MemoryStore::new();
            println!("{}", serde_json::to_string_pretty(&store.styles()).unwrap());
            Ok(())
        }
    }
}
