mod config;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use transparency_db::{SqlStore, create_pool, run_migrations};
use transparency_engine::{PageRequest, TransparencyScoreEngine};
use uuid::Uuid;

use crate::config::AppConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "transparency")]
#[command(about = "Inspect and maintain organization transparency scores")]
#[command(version = VERSION)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Create an organization's score at the baseline if missing
    Init {
        #[arg(long)]
        org: Uuid,
    },

    /// Show an organization's current score
    Score {
        #[arg(long)]
        org: Uuid,
    },

    /// Show an organization's score history, newest first
    History {
        #[arg(long)]
        org: Uuid,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Rank organizations by score
    Leaderboard {
        #[command(flatten)]
        page: PageArgs,
    },

    /// List organizations below the campaign creation floor
    LowScores {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Check whether an organization may open a new campaign
    CanCreate {
        #[arg(long)]
        org: Uuid,
    },

    /// Rebuild an organization's score from live campaign and evidence data
    Recalculate {
        #[arg(long)]
        org: Uuid,
    },

    /// Replay an organization's ledger and compare it with the live score
    Verify {
        #[arg(long)]
        org: Uuid,
    },

    /// Penalize completed campaigns whose evidence deadline has lapsed
    SweepDeadlines {
        /// Evaluate deadlines as of this RFC 3339 instant instead of now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Award the monthly consistency bonus
    Bonus {
        #[arg(long)]
        org: Uuid,
    },

    /// Feed a workflow event into the engine
    #[command(subcommand)]
    Event(EventCommand),
}

#[derive(Subcommand)]
enum EventCommand {
    /// Evidence passed review
    EvidenceApproved {
        #[arg(long)]
        evidence: Uuid,
        /// Override timeliness instead of judging it from the upload date
        #[arg(long)]
        on_time: Option<bool>,
    },
    /// Evidence failed review
    EvidenceRejected {
        #[arg(long)]
        evidence: Uuid,
    },
    /// A campaign's evidence deadline passed
    DeadlineMissed {
        #[arg(long)]
        campaign: Uuid,
    },
    CampaignCompleted {
        #[arg(long)]
        campaign: Uuid,
    },
    CampaignCancelled {
        #[arg(long)]
        campaign: Uuid,
    },
    /// A report against the organization was upheld
    ReportUpheld {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        report: Uuid,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 20)]
    per_page: u32,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        PageRequest::new(args.page, args.per_page)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.url))?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    let engine = TransparencyScoreEngine::with_store(SqlStore::new(pool), config.engine)
        .context("Failed to build score engine")?;

    run(&engine, cli.command).await
}

async fn run(engine: &TransparencyScoreEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Migrate => {
            info!("Schema is up to date");
            Ok(())
        }
        Commands::Init { org } => print_json(&engine.initialize_score(org).await?),
        Commands::Score { org } => print_json(&engine.get_organization_score(org).await?),
        Commands::History { org, page } => {
            print_json(&engine.get_score_history(org, page.into()).await?)
        }
        Commands::Leaderboard { page } => print_json(&engine.get_leaderboard(page.into()).await?),
        Commands::LowScores { page } => {
            print_json(&engine.get_low_score_organizations(page.into()).await?)
        }
        Commands::CanCreate { org } => {
            let allowed = engine.can_create_campaign(org).await?;
            print_json(&serde_json::json!({ "organization_id": org, "allowed": allowed }))
        }
        Commands::Recalculate { org } => print_json(&engine.recalculate_score(org).await?),
        Commands::Verify { org } => {
            let score = engine.verify_ledger(org).await?;
            print_json(&serde_json::json!({ "organization_id": org, "score": score }))
        }
        Commands::SweepDeadlines { now } => {
            let penalized = engine.sweep_missed_deadlines(now.unwrap_or_else(Utc::now)).await?;
            print_json(&penalized)
        }
        Commands::Bonus { org } => print_json(&engine.apply_consistency_bonus(org).await?),
        Commands::Event(event) => {
            let change = match event {
                EventCommand::EvidenceApproved { evidence, on_time } => {
                    let on_time = match on_time {
                        Some(on_time) => on_time,
                        None => engine.is_evidence_on_time(evidence).await?,
                    };
                    engine.on_evidence_approved(evidence, on_time).await?
                }
                EventCommand::EvidenceRejected { evidence } => {
                    engine.on_evidence_rejected(evidence).await?
                }
                EventCommand::DeadlineMissed { campaign } => {
                    engine.on_evidence_deadline_missed(campaign).await?
                }
                EventCommand::CampaignCompleted { campaign } => {
                    engine.on_campaign_completed(campaign).await?
                }
                EventCommand::CampaignCancelled { campaign } => {
                    engine.on_campaign_cancelled(campaign).await?
                }
                EventCommand::ReportUpheld { org, report } => {
                    engine.on_report_upheld_for_organization(org, report).await?
                }
            };
            print_json(&change)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}
