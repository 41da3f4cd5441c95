//! Check puzzle PGN files before deploying them.
//!
//! Every game must parse, replay legally and leave the solver at least one move.
//!
//! Usage: cargo run --bin validate-puzzles -- <pgn_dir> [--verbose]

use chess_core::notation::color_name;
use chess_core::parse_puzzles;
use puzzle_viewer::Puzzle;
use std::env;
use std::fs;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pgn_dir> [--verbose]", args[0]);
        std::process::exit(1);
    }

    let pgn_dir = &args[1];
    let verbose = args.iter().skip(2).any(|a| a == "--verbose");

    let pattern = format!("{}/*.pgn", pgn_dir);
    let mut pgn_files: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
    pgn_files.sort();

    if pgn_files.is_empty() {
        eprintln!("No PGN files found in {}", pgn_dir);
        std::process::exit(1);
    }

    println!("Found {} PGN files", pgn_files.len());

    let mut valid = 0usize;
    let mut invalid = 0usize;

    for pgn_path in &pgn_files {
        let text = fs::read_to_string(pgn_path)?;

        for (n, result) in parse_puzzles(&text).into_iter().enumerate() {
            let game = n + 1;
            let puzzle = result
                .map_err(|e| e.to_string())
                .and_then(|record| Puzzle::from_record(&record).map_err(|e| e.to_string()));

            match puzzle {
                Ok(puzzle) => {
                    valid += 1;
                    if verbose {
                        println!(
                            "  ok   {} #{}: {} to move, {} plies",
                            pgn_path.display(),
                            game,
                            color_name(puzzle.solver()),
                            puzzle.len()
                        );
                    }
                }
                Err(e) => {
                    invalid += 1;
                    println!("  FAIL {} #{}: {}", pgn_path.display(), game, e);
                }
            }
        }
    }

    println!();
    println!("{} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}
