use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod config;
mod console;
mod credential;
mod db;
mod models;
mod report;
mod store;

use config::{env_lookup, AdminConfig, ConsoleConfig, StoreConfig};
use console::ConsoleClient;

#[derive(Parser)]
#[command(name = "civic-admin")]
#[command(about = "Admin bootstrap and console for the civic issue reporting platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the administrator schema
    InitDb,
    /// Create the administrator from ADMIN_EMAIL / ADMIN_PASSWORD, or reset its password
    BootstrapAdmin,
    /// Check ADMIN_PASSWORD against the stored administrator hash
    VerifyAdmin,
    /// Show aggregate report statistics
    Stats {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Show the monthly leaderboard
    Leaderboard {
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Also export the leaderboard as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Write a markdown dashboard with statistics and leaderboard
    Dashboard {
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

#[derive(clap::Args)]
struct ApiArgs {
    /// Backend base URL
    #[arg(long, env = "API_BASE_URL")]
    api_url: String,
    /// Path of the report statistics endpoint
    #[arg(long, default_value = console::DEFAULT_STATS_PATH)]
    stats_path: String,
}

impl ApiArgs {
    fn client(&self) -> anyhow::Result<ConsoleClient> {
        let config = ConsoleConfig::from_lookup(&self.api_url, env_lookup)?;
        Ok(ConsoleClient::new(&config)?)
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civic_admin=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::InitDb => {
            let store_config = StoreConfig::from_lookup(env_lookup)?;
            let pool = db::connect(&store_config)
                .await
                .context("failed to connect to the record store")?;
            let result = db::init_db(&pool).await;
            pool.close().await;
            result?;
            println!("Schema ready.");
        }
        Commands::BootstrapAdmin => {
            let store_config = StoreConfig::from_lookup(env_lookup)?;
            let admin = AdminConfig::from_lookup(env_lookup)?;
            let outcome = bootstrap::run(&store_config, &admin)
                .await
                .context("error bootstrapping administrator")?;
            println!("Administrator {} {}.", admin.email, outcome);
        }
        Commands::VerifyAdmin => {
            let store_config = StoreConfig::from_lookup(env_lookup)?;
            let admin = AdminConfig::from_lookup(env_lookup)?;
            let verified = bootstrap::run_verify(&store_config, &admin)
                .await
                .context("error verifying administrator")?;
            if !verified {
                anyhow::bail!("password does not verify for {}", admin.email);
            }
            println!("Password verifies for {}.", admin.email);
        }
        Commands::Stats { api } => {
            let client = api.client()?;
            let stats = client
                .fetch_stats(&api.stats_path)
                .await
                .context("error loading report statistics; re-run to retry")?;
            print!("{}", report::render_stats(&stats));
        }
        Commands::Leaderboard { api, limit, csv } => {
            let client = api.client()?;
            let entries = client
                .fetch_leaderboard()
                .await
                .context("error loading leaderboard; re-run to retry")?;
            print!("{}", report::render_leaderboard(&entries, limit));
            if let Some(path) = csv {
                let written = report::write_leaderboard_csv(&path, &entries)?;
                println!("Exported {written} rows to {}.", path.display());
            }
        }
        Commands::Dashboard { api, limit, out } => {
            let client = api.client()?;
            let stats = client.fetch_stats(&api.stats_path).await;
            let entries = client.fetch_leaderboard().await;
            for err in [stats.as_ref().err(), entries.as_ref().err()].into_iter().flatten() {
                tracing::error!("{err}; re-run to retry");
            }

            let dashboard = report::build_dashboard(chrono::Utc::now(), &stats, &entries, limit);
            std::fs::write(&out, dashboard)?;
            println!("Dashboard written to {}.", out.display());

            if stats.is_err() || entries.is_err() {
                anyhow::bail!("dashboard written with failed sections");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bootstrap_takes_no_arguments() {
        assert!(Cli::try_parse_from(["civic-admin", "bootstrap-admin"]).is_ok());
        assert!(Cli::try_parse_from(["civic-admin", "bootstrap-admin", "--email", "x"]).is_err());
    }

    #[test]
    fn leaderboard_parses_flags() {
        let cli = Cli::try_parse_from([
            "civic-admin",
            "leaderboard",
            "--api-url",
            "http://localhost:5000/api",
            "--limit",
            "3",
            "--csv",
            "board.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Leaderboard { api, limit, csv } => {
                assert_eq!(api.api_url, "http://localhost:5000/api");
                assert_eq!(api.stats_path, "/reports/stats");
                assert_eq!(limit, 3);
                assert_eq!(csv, Some(PathBuf::from("board.csv")));
            }
            _ => panic!("expected leaderboard command"),
        }
    }
}
