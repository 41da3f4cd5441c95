//! In-memory puzzle library, loaded once at startup from a directory of PGN files.

use std::collections::HashMap;
use std::fs;

use chess_core::notation::color_name;
use chess_core::{parse_puzzles, PuzzleRecord};
use puzzle_viewer::{Puzzle, ViewerError};
use serde::Serialize;

/// Served when the puzzle directory yields nothing.
pub const DEMO_PUZZLES: &[(&str, &str)] = &[
    (
        "demo-knight-mate",
        "[FEN \"5r2/2R2P1k/7p/4q3/7K/8/6Q1/8 w - - 0 1\"]\n\n1. Qg8+ Rxg8 2. f8=N+ Kh8 3. Rh7#",
    ),
    (
        "demo-en-passant",
        "[FEN \"8/8/2pqp3/2Q2pkp/3P2p1/4P1P1/4KPP1/8 b - - 3 43\"]\n\n Qxc5 dxc5 Kf6 f4 gxf3+ Kxf3 Ke5 e4",
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleSummary {
    pub id: String,
    pub fen: String,
    pub solver: &'static str,
    pub plies: usize,
    pub first_move_blunder: bool,
    pub event: Option<String>,
}

#[derive(Debug, Default)]
pub struct PuzzleLibrary {
    records: Vec<(String, PuzzleRecord)>,
    index: HashMap<String, usize>,
}

impl PuzzleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.pgn` file in `dir`. Broken games are logged and skipped.
    /// Falls back to the demo puzzles when nothing loads.
    pub fn load(dir: &str) -> anyhow::Result<Self> {
        let mut library = Self::new();

        let pattern = format!("{}/*.pgn", dir);
        let mut files: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
        files.sort();

        for path in &files {
            let text = fs::read_to_string(path)?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "puzzle".to_string());
            let added = library.add_pgn(&stem, &text);
            tracing::info!("Loaded {} puzzles from {}", added, path.display());
        }

        if library.is_empty() {
            tracing::warn!("No puzzles found in {dir}, serving demo puzzles");
            return Ok(Self::demo());
        }

        Ok(library)
    }

    pub fn demo() -> Self {
        let mut library = Self::new();
        for (id, pgn) in DEMO_PUZZLES {
            let text = format!("[PuzzleId \"{id}\"]\n{pgn}");
            library.add_pgn(id, &text);
        }
        library
    }

    /// Add every valid game of a PGN text. Games without a `PuzzleId` tag get
    /// `<source>-<n>` ids. Returns how many were added.
    pub fn add_pgn(&mut self, source: &str, text: &str) -> usize {
        let mut added = 0;

        for (n, result) in parse_puzzles(text).into_iter().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping game {} of {}: {}", n + 1, source, e);
                    continue;
                }
            };

            // Must also be playable, e.g. a blunder-first line needs a solver move
            if let Err(e) = Puzzle::from_record(&record) {
                tracing::warn!("Skipping game {} of {}: {}", n + 1, source, e);
                continue;
            }

            let id = record
                .metadata
                .puzzle_id
                .clone()
                .unwrap_or_else(|| format!("{}-{}", source, n + 1));

            if self.index.contains_key(&id) {
                tracing::warn!("Duplicate puzzle id {id} in {source}, keeping the first");
                continue;
            }

            self.index.insert(id.clone(), self.records.len());
            self.records.push((id, record));
            added += 1;
        }

        added
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PuzzleRecord> {
        self.index.get(id).map(|&i| &self.records[i].1)
    }

    pub fn puzzle(&self, id: &str) -> Result<Puzzle, ViewerError> {
        let record = self
            .get(id)
            .ok_or_else(|| ViewerError::InvalidPuzzle(format!("unknown puzzle {id}")))?;
        Ok(Puzzle::from_record(record)?.with_id(id))
    }

    pub fn summaries(&self) -> Vec<PuzzleSummary> {
        self.records
            .iter()
            .filter_map(|(id, record)| {
                let puzzle = Puzzle::from_record(record).ok()?;
                Some(PuzzleSummary {
                    id: id.clone(),
                    fen: record.fen.clone(),
                    solver: color_name(puzzle.solver()),
                    plies: record.plies(),
                    first_move_blunder: record.metadata.first_move_blunder,
                    event: record.metadata.event.clone(),
                })
            })
            .collect()
    }
}
