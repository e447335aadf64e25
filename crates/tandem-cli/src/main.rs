use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tandem_editor::EditorConfig;
use tandem_ot::TextOperation;
use tracing_subscriber::EnvFilter;

mod replay;

#[derive(Parser)]
#[command(version, about = "Tandem - operational transformation for plain text", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a document after applying an operation to it
    Apply {
        /// Document to edit
        doc: PathBuf,
        /// Operation in JSON wire form
        op: PathBuf,
    },
    /// Print the inverse of an operation as JSON
    Invert {
        /// Document the operation applies to
        doc: PathBuf,
        /// Operation in JSON wire form
        op: PathBuf,
    },
    /// Print the composition of two consecutive operations as JSON
    Compose { a: PathBuf, b: PathBuf },
    /// Print `[a', b']` for two concurrent operations as JSON
    Transform { a: PathBuf, b: PathBuf },
    /// Play a scripted editing session and print every event as a JSON line
    Replay {
        script: PathBuf,

        /// Decoration settings (.json or .toml)
        #[arg(long, env = "TANDEM_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply { doc, op } => {
            let text = read(&doc)?;
            let op = read_operation(&op)?;
            print!("{}", op.apply(&text)?);
        }
        Commands::Invert { doc, op } => {
            let text = read(&doc)?;
            let op = read_operation(&op)?;
            println!("{}", op.invert(&text).to_json());
        }
        Commands::Compose { a, b } => {
            let (a, b) = (read_operation(&a)?, read_operation(&b)?);
            println!("{}", a.compose(&b)?.to_json());
        }
        Commands::Transform { a, b } => {
            let (a, b) = (read_operation(&a)?, read_operation(&b)?);
            let (a_prime, b_prime) = TextOperation::transform(&a, &b)?;
            println!(
                "{}",
                serde_json::to_string(&(a_prime, b_prime)).into_diagnostic()?
            );
        }
        Commands::Replay { script, config } => {
            let config = match config {
                Some(path) => EditorConfig::load(&path)?,
                None => EditorConfig::default(),
            };
            let script: replay::Script = serde_json::from_str(&read(&script)?)
                .into_diagnostic()
                .wrap_err("invalid replay script")?;
            let steps = script.steps.len();
            let replay = replay::run(script, config)?;
            for event in &replay.events {
                println!("{}", serde_json::to_string(event).into_diagnostic()?);
            }
            println!("{}", serde_json::to_string(&replay.text).into_diagnostic()?);
            tracing::info!(steps, events = replay.events.len(), "replay finished");
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", path.display()))
}

fn read_operation(path: &Path) -> Result<TextOperation> {
    let op = TextOperation::from_json(&read(path)?)?;
    tracing::debug!(path = %path.display(), %op, "loaded operation");
    Ok(op)
}

fn init_tracing() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    Ok(())
}
