//! Netminder CLI - substitute-goalie coordination
//!
//! Usage:
//!   netminder --roster roster.json receive <from> <text>   Inject an inbound message
//!   netminder --roster roster.json search <team> <game>    Start a goalie search
//!   netminder --roster roster.json status <team>           Show search progress
//!   netminder init-config                                  Write a default config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use netminder_assistant::{Assistant, JsonFileStore, SearchStart, SharedAssistant};
use netminder_core::{AssistantConfig, GameId, TeamId};
use netminder_oracle::{Model, ModelClient};
use netminder_roster::FixtureRoster;
use netminder_transport::{ConsoleTransport, SmsGateway, Transport};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "netminder")]
#[command(version, about = "Substitute-goalie coordination over text messages")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(long, default_value = "netminder.toml")]
    config: PathBuf,

    /// Roster fixture file (JSON)
    #[arg(long, value_name = "FILE")]
    roster: Option<PathBuf>,

    /// Override the state file location from the config
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Log outbound texts instead of sending SMS
    #[arg(long)]
    console: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject an inbound text message
    Receive {
        /// Sender phone number
        from: String,

        /// Message text
        text: String,
    },

    /// Start a goalie search for a game
    Search {
        /// Team id
        team_id: TeamId,

        /// Game id
        game_id: GameId,
    },

    /// Show search progress for a team
    Status {
        /// Team id
        team_id: TeamId,
    },

    /// Write a default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to initialize logging")?;

    if let Commands::InitConfig = cli.command {
        AssistantConfig::write_default(&cli.config)?;
        info!("Wrote default configuration to {:?}", cli.config);
        return Ok(());
    }

    let mut config = AssistantConfig::load_or_default(&cli.config)?;
    if let Some(state) = &cli.state {
        config.state_path = state.clone();
    }

    let assistant = build_assistant(&cli, config).await?;

    match cli.command {
        Commands::Receive { from, text } => {
            assistant.receive(&from, &text).await?;
            info!("Message processed");
        }
        Commands::Search { team_id, game_id } => {
            match assistant.initiate_search(team_id, game_id).await? {
                SearchStart::Started => info!("Goalie search started for game {}", game_id),
                SearchStart::AlreadyInProgress => {
                    info!("A goalie search is already running for game {}", game_id)
                }
            }
        }
        Commands::Status { team_id } => {
            let report = assistant.describe_searches(team_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::InitConfig => unreachable!("handled above"),
    }

    Ok(())
}

async fn build_assistant(
    cli: &Cli,
    config: AssistantConfig,
) -> Result<SharedAssistant<FixtureRoster, ModelClient, Box<dyn Transport>, JsonFileStore>> {
    let Some(roster_path) = &cli.roster else {
        bail!("--roster <FILE> is required for this command");
    };
    let roster = FixtureRoster::load(roster_path)
        .with_context(|| format!("Failed to load roster from {:?}", roster_path))?;

    let model: Model = config
        .model
        .default
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let oracle = ModelClient::from_env(model, &config.model.api_key_env)?;

    let transport: Box<dyn Transport> = if cli.console || !config.sms.enabled {
        Box::new(ConsoleTransport)
    } else {
        Box::new(SmsGateway::from_env(&config.sms)?)
    };

    let store = JsonFileStore::new(&config.state_path);
    let assistant = Assistant::load_or_new(config, roster, oracle, transport, store).await?;

    Ok(SharedAssistant::new(assistant))
}
