use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eyeline_core::{ConfidencePolicy, ContactPolicy, EngineConfig, EyeContactEngine};
use tracing_subscriber::EnvFilter;

mod client;
mod replay;

#[derive(Parser)]
#[command(name = "eyeline", version, about = "Eye-contact scoring from facial landmarks")]
struct Cli {
    /// Engine configuration file (TOML). Defaults to `$EYELINE_CONFIG`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Contact policy: head_pose, iris or strict.
    #[arg(long, global = true)]
    policy: Option<ContactPolicy>,

    /// Confidence policy: ratio, penalty or blended.
    #[arg(long, global = true)]
    confidence: Option<ConfidencePolicy>,

    /// Number of recent decisions in the smoothing window.
    #[arg(long, global = true)]
    window: Option<usize>,

    /// Talk to a daemon on the session bus instead of the system bus.
    #[arg(long, global = true)]
    session_bus: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a JSONL recording of landmark frames offline.
    Replay {
        file: PathBuf,
        /// Print only the session summary.
        #[arg(long)]
        summary_only: bool,
    },
    /// Print the effective engine configuration as TOML.
    Config,
    /// Show the status of a running eyelined.
    Status,
    /// Show the latest frame result of a daemon session.
    Latest { session: String },
    /// Show the summary of a daemon session.
    Summary { session: String },
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| std::env::var_os("EYELINE_CONFIG").map(PathBuf::from));
        let mut config = match &path {
            Some(path) => EngineConfig::from_toml_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(policy) = self.policy {
            config.contact_policy = policy;
        }
        if let Some(confidence) = self.confidence {
            config.confidence_policy = confidence;
        }
        if let Some(window) = self.window {
            config.history_len = window;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.cmd {
        Commands::Replay { file, summary_only } => {
            let config = cli.engine_config()?;
            run_replay(config, file, *summary_only)?;
        }
        Commands::Config => {
            let config = cli.engine_config()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Status => {
            println!("{}", client::status(cli.session_bus).await?);
        }
        Commands::Latest { session } => {
            println!("{}", client::latest(cli.session_bus, session).await?);
        }
        Commands::Summary { session } => {
            println!("{}", client::summary(cli.session_bus, session).await?);
        }
    }
    Ok(())
}

fn run_replay(config: EngineConfig, file: &Path, summary_only: bool) -> Result<()> {
    let input = File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let mut engine = EyeContactEngine::new(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    replay::replay(&mut engine, BufReader::new(input), &mut out, summary_only)?;
    Ok(())
}
