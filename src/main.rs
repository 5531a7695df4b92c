//! avl-unique - count the distinct lines of a file
//!
//! Usage:
//!   avl-unique <naive|avl|both> <PATH> [--dump-tree]

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avl_tally::ingest::{self, Config, Mode};
use avl_tally::Error;

#[derive(Parser)]
#[command(name = "avl-unique")]
#[command(about = "Prints the number of unique lines in a file")]
struct Cli {
    /// Counting strategy
    #[arg(value_enum)]
    mode: ModeArg,

    /// File to read
    path: PathBuf,

    /// Print the tree sideways after the avl report
    #[arg(long)]
    dump_tree: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Naive,
    Avl,
    /// Run both strategies and time them against each other
    #[value(alias = "compare")]
    Both,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Naive => Mode::Naive,
            ModeArg::Avl => Mode::Avl,
            ModeArg::Both => Mode::Compare,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avl_tally=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config {
        mode: cli.mode.into(),
        path: cli.path,
        dump_tree: cli.dump_tree,
    };

    println!("Finding unique lines in {}", config.path.display());
    match ingest::run(&config) {
        Ok(report) => println!("{report}"),
        Err(err @ Error::FileNotFound { .. }) => println!("{err}"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
