use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use nura::config::{Config, DEFAULT_CONFIG_PATH};
use nura::events::ConsoleEvent;
use nura::repl;
use nura::{CommandResolver, FuzzyStrategy, LocaleSetting};

#[derive(Parser)]
#[command(name = "nura", version, about = "Voice/text intent console")]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Minimum catalog score for a direct match (0.0-1.0)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// damerau, soundex, double-metaphone or hybrid
    #[arg(long, global = true)]
    strategy: Option<FuzzyStrategy>,

    /// auto, es, en or es-419
    #[arg(long, global = true)]
    locale: Option<LocaleSetting>,

    /// Classify without side-effects
    #[arg(long, global = true)]
    explain: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one utterance and print the result
    Resolve {
        #[arg(required = true)]
        utterance: Vec<String>,
    },
    /// Print the full candidate ranking for an utterance
    Explain {
        #[arg(required = true)]
        utterance: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nura=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn async_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    config.explain |= cli.explain;
    config.validate()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ConsoleEvent>();
    let mut resolver = CommandResolver::new(&config, Some(event_tx))?;

    match cli.command {
        Some(Command::Resolve { utterance }) => {
            let resolved = resolver.resolve(&utterance.join(" "));
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            for line in repl::drain_events(&mut event_rx)? {
                println!("{}", line);
            }
        }
        Some(Command::Explain { utterance }) => {
            resolver.set_explain(true);
            let resolved = resolver.resolve(&utterance.join(" "));
            let report = json!({
                "resolved": resolved,
                "threshold": resolver.threshold(),
                "strategy": resolver.strategy(),
                "ranking": resolver.last_ranking(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => repl::run(resolver, event_rx).await?,
    }

    Ok(())
}
