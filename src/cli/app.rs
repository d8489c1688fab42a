use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use storesync::{CreateAttribute, EntityProfile, ResolveError, SyncConfig, SyncEngine, SyncStatus};
use tracing::info;

/// Attribute entities the back-office synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Work,
    Author,
    Publisher,
}

impl EntityArg {
    fn profile(self) -> EntityProfile {
        match self {
            Self::Work => EntityProfile::literary_work(),
            Self::Author => EntityProfile::author(),
            Self::Publisher => EntityProfile::publisher(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "storesync", version, about = "Synchronize attribute entities between the content and catalog stores")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an entity in the content store and mirror it in the catalog
    Create {
        #[arg(long, value_enum, default_value_t = EntityArg::Work)]
        entity: EntityArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        slug: Option<String>,
    },
    /// Locate a content record by stable or numeric id and show its linkage
    Resolve {
        #[arg(long, value_enum, default_value_t = EntityArg::Work)]
        entity: EntityArg,
        id: String,
    },
    /// Print the slug derived from a name
    Slug { name: String },
}

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Runs the command. `Ok(false)` means the operation itself failed and
    /// was reported on stdout.
    pub async fn run(self) -> Result<bool> {
        match self.cli.command {
            Command::Slug { name } => {
                let max_len = SyncConfig::slug_max_len_from_env()
                    .context("failed to load storesync configuration")?;
                println!("{}", storesync::derive_slug(&name, max_len));
                Ok(true)
            }
            Command::Create {
                entity,
                name,
                description,
                slug,
            } => {
                let engine = Self::engine()?;
                let profile = entity.profile();
                let input = CreateAttribute {
                    name,
                    description,
                    slug,
                };
                match engine.synchronize_create(&profile, input).await {
                    Ok(outcome) => {
                        info!(stable_id = %outcome.stable_id, "create finished");
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                        Ok(true)
                    }
                    Err(err) => {
                        let report = json!({
                            "error": err.kind().to_string(),
                            "message": err.to_string(),
                            "upstream_status": err.upstream_status(),
                        });
                        println!("{}", serde_json::to_string_pretty(&report)?);
                        Ok(false)
                    }
                }
            }
            Command::Resolve { entity, id } => {
                let engine = Self::engine()?;
                let profile = entity.profile();
                match engine.resolve_record(&profile, &id).await {
                    Ok(record) => {
                        let report = json!({
                            "status": record.status(),
                            "record": record,
                        });
                        println!("{}", serde_json::to_string_pretty(&report)?);
                        Ok(true)
                    }
                    Err(ResolveError::NotFound { id }) => {
                        let report = json!({ "status": SyncStatus::Absent, "id": id });
                        println!("{}", serde_json::to_string_pretty(&report)?);
                        Ok(false)
                    }
                    Err(err) => Err(err).context("content store unavailable"),
                }
            }
        }
    }

    fn engine() -> Result<SyncEngine> {
        let config = SyncConfig::from_env().context("failed to load storesync configuration")?;
        SyncEngine::from_config(&config).context("failed to build store clients")
    }
}
