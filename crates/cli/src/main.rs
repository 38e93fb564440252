use anyhow::Result;
use clap::{Parser, Subcommand};
use splitflow_core::{ConfigLoader, NewExperiment, NewVariant};
use splitflow_web_api::ApiServer;

#[derive(Parser)]
#[command(name = "splitflow")]
#[command(about = "A/B experiment assignment and statistics service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web API server
    Server {
        /// Server address override, e.g. "0.0.0.0:3001"
        #[arg(short, long)]
        addr: Option<String>,
        /// Config profile, e.g. "production"
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Apply pending database migrations
    Migrate {
        /// Config profile, e.g. "production"
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Create the default experiment if no experiments exist yet
    Seed {
        /// Config profile, e.g. "production"
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { addr, profile } => {
            let config = load_config(profile.as_deref())?;
            let addr = addr
                .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

            let pool = splitflow_data::connect(&config.database).await?;
            splitflow_data::run_migrations(&pool).await?;

            ApiServer::new(pool).serve(&addr).await?;
        }
        Commands::Migrate { profile } => {
            let config = load_config(profile.as_deref())?;
            let pool = splitflow_data::connect(&config.database).await?;
            splitflow_data::run_migrations(&pool).await?;
            tracing::info!("Migrations applied");
        }
        Commands::Seed { profile } => {
            let config = load_config(profile.as_deref())?;
            let pool = splitflow_data::connect(&config.database).await?;
            splitflow_data::run_migrations(&pool).await?;
            seed_default_experiment(pool).await?;
        }
    }

    Ok(())
}

fn load_config(profile: Option<&str>) -> Result<splitflow_core::AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile),
        None => ConfigLoader::load(),
    }
}

/// Creates the default 50/50 hero experiment used by the landing flow,
/// unless experiments already exist.
async fn seed_default_experiment(pool: sqlx::PgPool) -> Result<()> {
    let repos = splitflow_data::Repositories::new(pool);

    let existing = repos.experiments.list().await?;
    if !existing.is_empty() {
        tracing::info!(count = existing.len(), "experiments already exist, skipping seed");
        return Ok(());
    }

    let experiment = repos
        .experiments
        .create(NewExperiment {
            name: "Homepage Hero Test".to_string(),
            description: "Test different hero section messaging for conversion optimization"
                .to_string(),
            variants: vec![
                NewVariant {
                    name: "control".to_string(),
                    description: "Original hero messaging".to_string(),
                },
                NewVariant {
                    name: "variant_a".to_string(),
                    description: "Benefits-focused messaging".to_string(),
                },
            ],
            traffic_split: vec![50, 50],
        })
        .await?;

    tracing::info!(experiment_id = %experiment.id, "seeded default experiment");
    Ok(())
}
