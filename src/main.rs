use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod models;
mod report;
mod schema;
mod server;
mod stats;
mod store;
mod validity;

use crate::store::RecordStore;

#[derive(Parser)]
#[command(name = "grade-stats")]
#[command(about = "Learner records and pass-rate statistics service", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the schema and register validators
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import learners or grades from a CSV file
    #[command(group(
        ArgGroup::new("source")
            .args(["grades", "learners"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        grades: Option<PathBuf>,
        #[arg(long)]
        learners: Option<PathBuf>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value_t = 5050)]
        port: u16,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = db::PgStore::new(pool);

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.pool()).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { grades, learners } => {
            if let Some(csv) = grades {
                let inserted = db::import_grades_csv(store.pool(), &csv).await?;
                println!("Inserted {inserted} grade records from {}.", csv.display());
            } else if let Some(csv) = learners {
                let inserted = db::import_learners_csv(store.pool(), &csv).await?;
                println!("Inserted {inserted} learners from {}.", csv.display());
            }
        }
        Commands::Serve { host, port } => {
            let state = server::AppState {
                store: Arc::new(store),
            };
            server::serve(state, &host, port).await?;
        }
        Commands::Report { out } => {
            let learners = store.learners().await?;
            let grades = store.grades().await?;
            let report = report::build_report(chrono::Utc::now(), &learners, &grades);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
