use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "courtside competitive-play backend")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the backend server with the background deadline sweeper
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Run a single deadline sweep and exit
    Sweep,
    /// Initialize (or reset) the database schema
    Setup,
}
