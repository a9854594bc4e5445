use anyhow::{Context as _, Result};
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use pushpull::{config, db, types::OutputFmt};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => std::env::var("PUSHPULL_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("pushpull=debug"),
        _ => EnvFilter::new("pushpull=trace,sqlx=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let fmt = OutputFmt::from_flag(cli.json);
    let config_path = config::default_config_path().context("Could not determine config directory")?;

    // Config must work even when the database cannot be opened.
    let cmd = match cli.cmd {
        Commands::Config(cmd) => return commands::config::handle(cmd, &config_path, fmt),
        other => other,
    };

    let cfg = config::Config::load(&config_path)?;
    let db_path = cfg.db_path().context("Could not determine data directory")?;
    let pool = db::open(&db_path)
        .await
        .with_context(|| format!("Could not open database at {}", db_path.display()))?;
    let ctx = commands::Ctx::new(pool, fmt, cfg, &db_path);

    match cmd {
        Commands::Exercise(cmd) => commands::exercise::handle(cmd, &ctx).await,
        Commands::Day(cmd) => commands::day::handle(cmd, &ctx).await,
        Commands::Session(cmd) => commands::session::handle(cmd, &ctx).await,
        Commands::History(cmd) => commands::history::handle(cmd, &ctx).await,
        Commands::Stats(cmd) => commands::stats::handle(cmd, &ctx).await,
        Commands::Calendar { year, month } => commands::calendar::handle(&ctx, year, month).await,
        Commands::Backup(cmd) => commands::backup::handle(cmd, &ctx).await,
        Commands::Settings(cmd) => commands::settings::handle(cmd, &ctx).await,
        Commands::Config(_) => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
