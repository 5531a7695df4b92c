//! Line ingestion: counts the distinct lines of a text stream.
//!
//! Two strategies are available. [`tally_reader`] feeds every line into a
//! [`TallyTree`]; [`naive_unique`] keeps a plain list of the lines seen so far
//! and scans it linearly for each new line, which is `O(n²)` and only exists
//! as a baseline to compare against.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::{Error, Result, TallyTree};

/// Which counting strategy [`run`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Linear scan over the lines seen so far.
    Naive,
    /// Balanced tree, also reporting the most frequent line.
    #[default]
    Avl,
    /// Both strategies, timed against each other.
    Compare,
}

/// Configuration for a single [`run`].
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// File to read lines from.
    pub path: PathBuf,
    /// Include a sideways dump of the tree in [`Mode::Avl`] reports.
    pub dump_tree: bool,
}

impl Config {
    pub fn new(mode: Mode, path: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            path: path.into(),
            dump_tree: false,
        }
    }
}

/// Outcome of a [`run`]. Its `Display` impl is the report printed by the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Naive {
        distinct: usize,
    },
    Avl {
        distinct: usize,
        most_frequent: Option<(String, u64)>,
        tree: Option<String>,
    },
    Compare {
        distinct_avl: usize,
        distinct_naive: usize,
        avl_elapsed: Duration,
        naive_elapsed: Duration,
    },
}

/// Inserts every line of `reader` into a fresh [`TallyTree`].
pub fn tally_reader<R: BufRead>(reader: R) -> io::Result<TallyTree> {
    let mut tree = TallyTree::new();
    for line in reader.lines() {
        tree.insert(&line?);
    }
    Ok(tree)
}

/// Counts distinct lines by exhaustive linear search against a growing list.
pub fn naive_unique<I, S>(lines: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if !seen.iter().any(|s| s == line) {
            seen.push(line.to_owned());
        }
    }
    seen.len()
}

/// [`naive_unique`] over the lines of `reader`.
pub fn naive_unique_reader<R: BufRead>(reader: R) -> io::Result<usize> {
    let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
    Ok(naive_unique(lines))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::from_io(path, e))
}

/// Reads `config.path` and counts its distinct lines with the configured strategy.
pub fn run(config: &Config) -> Result<Report> {
    let path = config.path.as_path();
    tracing::debug!(mode = ?config.mode, path = %path.display(), "counting unique lines");

    let report = match config.mode {
        Mode::Naive => {
            let distinct =
                naive_unique_reader(open(path)?).map_err(|e| Error::from_io(path, e))?;
            Report::Naive { distinct }
        }
        Mode::Avl => {
            let tree = tally_reader(open(path)?).map_err(|e| Error::from_io(path, e))?;
            tracing::info!(
                distinct = tree.len(),
                height = ?tree.height(),
                "built tally tree"
            );
            Report::Avl {
                distinct: tree.len(),
                most_frequent: tree
                    .most_frequent()
                    .map(|(key, count)| (key.to_owned(), count)),
                tree: config.dump_tree.then(|| tree.sideways().to_string()),
            }
        }
        Mode::Compare => {
            let start = Instant::now();
            let distinct_avl = tally_reader(open(path)?)
                .map_err(|e| Error::from_io(path, e))?
                .len();
            let avl_elapsed = start.elapsed();

            let start = Instant::now();
            let distinct_naive =
                naive_unique_reader(open(path)?).map_err(|e| Error::from_io(path, e))?;
            let naive_elapsed = start.elapsed();

            tracing::info!(?avl_elapsed, ?naive_elapsed, "compared strategies");
            if distinct_avl != distinct_naive {
                tracing::warn!(distinct_avl, distinct_naive, "strategies disagree");
            }

            Report::Compare {
                distinct_avl,
                distinct_naive,
                avl_elapsed,
                naive_elapsed,
            }
        }
    };

    Ok(report)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Naive { distinct } => write!(f, "Naive:\n{distinct}"),
            Report::Avl {
                distinct,
                most_frequent,
                tree,
            } => {
                write!(f, "AVL:\n{distinct}")?;
                if let Some((key, count)) = most_frequent {
                    write!(f, "\nMost common line: {key}, with {count} occurrences.")?;
                }
                if let Some(tree) = tree {
                    write!(f, "\n\n{tree}")?;
                }
                Ok(())
            }
            Report::Compare {
                distinct_avl,
                distinct_naive,
                avl_elapsed,
                naive_elapsed,
            } => {
                writeln!(f, "AVL:\n{distinct_avl}")?;
                writeln!(f, "Naive:\n{distinct_naive}")?;
                write!(
                    f,
                    "  Results:\n\n    AVL:   {:5.2}s\n\n    Naive: {:5.2}s\n",
                    avl_elapsed.as_secs_f64(),
                    naive_elapsed.as_secs_f64()
                )
            }
        }
    }
}
