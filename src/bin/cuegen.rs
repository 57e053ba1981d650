//! Config CUE Generator CLI
//!
//! Generates `encore.gen.cue` files for every service described by a
//! schema metadata file, or checks that the files on disk are current.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cuegen::{CuegenConfig, CuegenError, DeclRegistry, Generator, Meta, OutputWriter, ServiceOutcome, WriteOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cuegen")]
#[command(about = "Generate CUE config documents from service config types")]
#[command(version)]
struct Cli {
    /// Explicit config file, layered over cuegen.toml and the XDG config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one document per service
    Generate {
        /// Schema metadata produced by the parser (JSON)
        meta: PathBuf,

        /// Only generate this service
        #[arg(short, long)]
        service: Option<String>,

        /// Output root (overrides output.dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Don't write; print a diff for stale files and fail if any
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the run completed but found problems
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_path = cli.config.as_deref().map(|p| p.to_string_lossy().into_owned());
    let mut config = CuegenConfig::load_from(config_path.as_deref()).context("Failed to load configuration")?;

    if cli.print_config {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(true);
    }

    let Some(Commands::Generate {
        meta,
        service,
        out_dir,
        check,
    }) = cli.command
    else {
        bail!("Nothing to do: pass a subcommand or --print-config");
    };

    if let Some(dir) = out_dir {
        config.output.dir = dir;
    }

    let meta = Meta::from_path(&meta).with_context(|| format!("Failed to read {}", meta.display()))?;
    let registry = DeclRegistry::new(meta.decls).context("Invalid declarations")?;
    let generator = Generator::new(&registry, &config.generator);
    let writer = OutputWriter::new(&config.output);

    let outcomes = match service {
        Some(name) => match generator.generate_named(&meta.services, &name) {
            Err(e @ CuegenError::UnknownService(_)) => return Err(e.into()),
            result => vec![ServiceOutcome { service: name, result }],
        },
        None => generator.generate_all(&meta.services),
    };

    let mut ok = true;
    for outcome in outcomes {
        let doc = match outcome.result {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("❌ {}: {}", outcome.service, e);
                ok = false;
                continue;
            }
        };

        if check {
            if let Some(stale) = writer.check(&outcome.service, doc.as_ref())? {
                println!("⚠️  {} is out of date", stale.path.display());
                print!("{}", stale.diff);
                ok = false;
            }
            continue;
        }

        match writer.write(&outcome.service, doc.as_ref())? {
            WriteOutcome::Created => println!("✅ {} (created)", writer.path_for(&outcome.service).display()),
            WriteOutcome::Updated => println!("✅ {} (updated)", writer.path_for(&outcome.service).display()),
            WriteOutcome::Removed => println!("🗑️  {} (removed)", writer.path_for(&outcome.service).display()),
            WriteOutcome::Unchanged | WriteOutcome::Skipped => {}
        }
    }

    if check && ok {
        println!("✅ All config documents are up to date");
    }
    Ok(ok)
}
