mod cli;

use clap::Parser;
use cli::{ClassifyArgs, Cli, Commands, RunArgs, ServeArgs};
use hintbox::api::AppState;
use hintbox::classify::classify;
use hintbox::config::Config;
use hintbox::issuer::{DryRunIssuer, HintIssuer, NetworkIssuer};
use hintbox::links::parse_link_list;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hintbox=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify(args) => classify_address(args)?,
        Commands::Run(args) => run_batch(args).await?,
        Commands::Serve(args) => serve(args).await?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn build_issuer(config: &Config, dry_run: bool) -> Result<Arc<dyn HintIssuer>, AnyError> {
    if dry_run {
        return Ok(Arc::new(DryRunIssuer::new()));
    }
    Ok(Arc::new(NetworkIssuer::new(config.http.issuer_config())?))
}

fn classify_address(args: ClassifyArgs) -> Result<(), AnyError> {
    let document = Url::parse(&args.origin)?;
    match classify(&args.address, &document, args.allow_query) {
        Some(method) => println!("{method}"),
        None => println!("ignored"),
    }
    Ok(())
}

async fn run_batch(args: RunArgs) -> Result<(), AnyError> {
    let mut config = load_config(args.config)?;
    if let Some(origin) = args.origin {
        config.links.document_origin = origin;
    }

    let mut addresses = args.addresses;
    if let Some(path) = &args.links {
        let contents = tokio::fs::read_to_string(path).await?;
        addresses.extend(parse_link_list(&contents));
    }

    let issuer = build_issuer(&config, args.dry_run)?;
    let state = AppState::new(config, issuer)?;

    let report = state.feed.scan(&addresses).await;
    if let Some(reason) = report.gated {
        info!(%reason, "Connection gate closed, nothing scheduled");
    }
    info!(
        admitted = report.admitted,
        already_known = report.already_known,
        rejected = report.rejected,
        "Links scheduled"
    );

    state.scheduler.wait_idle().await;

    print!("{}", state.board.render());
    let metrics = state.scheduler.metrics().snapshot();
    println!(
        "issued={} completed={} failed={} skipped={}",
        metrics.issued, metrics.completed, metrics.failed, metrics.skipped
    );
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<(), AnyError> {
    let mut config = load_config(args.config)?;
    if let Some(address) = args.address {
        config.server.bind_addr = address;
    }

    let issuer = build_issuer(&config, args.dry_run)?;
    hintbox::api::run(config, issuer, args.links).await
}
