use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hintbox")]
#[command(about = "Prefetch hint scheduler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the hint method chosen for an address
    Classify(ClassifyArgs),
    /// Schedule a batch of links, wait until all hints settle, print the board
    Run(RunArgs),
    /// Run the HTTP API
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ClassifyArgs {
    pub address: String,

    /// Document whose host counts as same-origin
    #[arg(long, default_value = "http://localhost/")]
    pub origin: String,

    /// Preconnect to addresses carrying a query string instead of ignoring them
    #[arg(long)]
    pub allow_query: bool,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults to HINTBOX_CONFIG or config/hintbox.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides `links.document_origin`
    #[arg(long)]
    pub origin: Option<String>,

    /// File with one address per line
    #[arg(long)]
    pub links: Option<PathBuf>,

    /// Log hints instead of touching the network
    #[arg(long)]
    pub dry_run: bool,

    pub addresses: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to HINTBOX_CONFIG or config/hintbox.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Link list rescanned every `links.scan_interval`
    #[arg(long)]
    pub links: Option<PathBuf>,

    /// Log hints instead of touching the network
    #[arg(long)]
    pub dry_run: bool,
}
