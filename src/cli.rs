use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file
    #[clap(short, long, default_value = "config.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start linkcard as a service.
    Daemon {
        /// Override the configured bind address
        #[clap(short, long)]
        bind: Option<String>,
    },

    /// Fetch a url and print its preview metadata
    Preview {
        /// a url
        url: String,
    },

    /// Print the style catalog
    Styles {},
}
