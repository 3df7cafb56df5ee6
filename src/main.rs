use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use githubrepos::config::LoggingConfig;
use githubrepos::{resolve, AllRepositories, Config, EnvFallbacks, RepositorySetState};

#[derive(Parser)]
#[command(name = "githubrepos")]
#[command(about = "Declarative tracking of an organization's GitHub repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file skeleton
    Init {
        /// Organization whose repositories are tracked
        #[arg(long)]
        owner: Option<String>,
    },

    /// Resolve the provider configuration and report any problems
    Validate,

    /// Record a planned repository set, filling in repository IDs
    Create {
        /// Planned state (JSON)
        #[arg(long)]
        plan: PathBuf,

        /// State file to write
        #[arg(long)]
        state: PathBuf,
    },

    /// Refresh repository IDs in an existing state file
    Read {
        /// State file to refresh in place
        #[arg(long)]
        state: PathBuf,
    },

    /// Replace the tracked repository set with a new plan
    Update {
        /// Planned state (JSON)
        #[arg(long)]
        plan: PathBuf,

        /// State file to overwrite
        #[arg(long)]
        state: PathBuf,
    },

    /// Stop tracking the repository set (GitHub is not modified)
    Delete {
        /// State file to remove
        #[arg(long)]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // init may target a file that does not exist yet
    let config = match (&cli.command, cli.config.as_deref()) {
        (Commands::Init { .. }, Some(path)) if !path.exists() => Config::default(),
        (_, path) => Config::load_or_default(path)?,
    };

    init_logging(&config.logging, cli.verbose)?;
    info!("Starting githubrepos v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Init { owner } => cmd_init(owner, cli.config, &config),
        Commands::Validate => cmd_validate(&config),
        Commands::Create { plan, state } => {
            let resource = configure(&config)?;
            let planned = read_state(&plan)?;
            let created = resource.create(planned).await?;
            write_state(&state, &created)
        }
        Commands::Read { state } => {
            let resource = configure(&config)?;
            let current = read_state(&state)?;
            let refreshed = resource.read(current).await?;
            write_state(&state, &refreshed)
        }
        Commands::Update { plan, state } => {
            let resource = configure(&config)?;
            let planned = read_state(&plan)?;
            let updated = resource.update(planned).await?;
            write_state(&state, &updated)
        }
        Commands::Delete { state } => {
            let resource = configure(&config)?;
            resource.delete(read_state(&state)?);
            std::fs::remove_file(&state)
                .with_context(|| format!("Failed to remove state file: {:?}", state))
        }
    }
}

/// Initialize logging from configuration, with --verbose forcing debug
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(logging.color);

    match logging.format.as_str() {
        "pretty" => tracing_subscriber::registry()
            .with(layer.pretty())
            .with(filter)
            .try_init(),
        "full" => tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(layer.compact())
            .with(filter)
            .try_init(),
    }
    .context("Failed to initialize logging")?;

    Ok(())
}

/// Resolve the provider configuration into a bound resource
fn configure(config: &Config) -> Result<AllRepositories> {
    let resolved = resolve(&config.connection(), &EnvFallbacks::from_env())
        .map_err(|diagnostics| anyhow!("Provider configuration is invalid:\n{}", diagnostics))?;

    Ok(AllRepositories::configure(&resolved))
}

fn cmd_init(owner: Option<String>, path: Option<PathBuf>, config: &Config) -> Result<()> {
    let config_path = match path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    let mut new_config = config.clone();
    if owner.is_some() {
        new_config.owner = owner;
    }
    new_config.save(&config_path)?;

    println!("✅ Configuration saved to: {:?}", config_path);
    if new_config.token.is_none() {
        println!("   Token: set `token` in the file or export GITHUB_TOKEN");
    }

    Ok(())
}

fn cmd_validate(config: &Config) -> Result<()> {
    match resolve(&config.connection(), &EnvFallbacks::from_env()) {
        Ok(resolved) => {
            println!("✅ Provider configuration is valid");
            println!("   Owner: {}", resolved.owner());
            println!("   Endpoint: {}", resolved.client().base_url());
            Ok(())
        }
        Err(diagnostics) => {
            for error in &diagnostics {
                match error.attribute() {
                    Some(attribute) => println!("❌ {} ({})", error.summary(), attribute),
                    None => println!("❌ {}", error.summary()),
                }
                println!("   {}", error);
            }
            Err(anyhow!(
                "{} configuration problem(s) found",
                diagnostics.len()
            ))
        }
    }
}

fn read_state(path: &Path) -> Result<RepositorySetState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {:?}", path))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse state file: {:?}", path))
}

fn write_state(path: &Path, state: &RepositorySetState) -> Result<()> {
    let content = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write state file: {:?}", path))?;

    info!("Wrote {} tracked repositories to {:?}", state.repos.len(), path);
    Ok(())
}
