//! Where instances come from: a file, standard input or the planted generator.
//!
//! A [`GraphSource`] is an iterator that yields each of its instances once and
//! then ends.

use crate::error::GraphParseError;
use crate::generate::{generate_planted, PlantedParams};
use crate::graph::Graph;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Origin of an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A graph file in the plain-text format.
    File(PathBuf),
    /// The plain-text format read from standard input.
    Stdin,
    /// A planted random instance. Without a seed one is drawn from the OS.
    Planted {
        /// Instance shape.
        params: PlantedParams,
        /// Generator seed.
        seed: Option<u64>,
    },
}

impl Origin {
    fn load(self) -> Result<Graph, GraphParseError> {
        match self {
            Origin::File(path) => {
                debug!(path = %path.display(), "reading graph file");
                Graph::load_from_file(&path)
            }
            Origin::Stdin => {
                debug!("reading graph from stdin");
                Graph::read_from(io::stdin().lock())
            }
            Origin::Planted { params, seed } => {
                let seed = seed.unwrap_or_else(rand::random);
                debug!(%params, seed, "generating planted instance");
                let mut rng = SmallRng::seed_from_u64(seed);
                Ok(generate_planted(&mut rng, &params))
            }
        }
    }
}

/// Single-shot instance stream.
#[derive(Clone, Debug)]
pub struct GraphSource {
    pending: Option<Origin>,
}

impl GraphSource {
    /// A source yielding the instance described by `origin`.
    pub fn new(origin: Origin) -> Self {
        Self {
            pending: Some(origin),
        }
    }

    /// Reads `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Origin::File(path.into()))
    }

    /// Reads standard input.
    pub fn stdin() -> Self {
        Self::new(Origin::Stdin)
    }

    /// Generates one planted instance.
    pub fn planted(params: PlantedParams, seed: Option<u64>) -> Self {
        Self::new(Origin::Planted { params, seed })
    }
}

impl Iterator for GraphSource {
    type Item = Result<Graph, GraphParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.take().map(Origin::load)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.pending.is_some());
        (n, Some(n))
    }
}
