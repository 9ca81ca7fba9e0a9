//! Reference vs. Performance Alignment Example
//!
//! Aligns a performance MIDI file against a reference MIDI file note by
//! note, then looks for the passages both files share. The aligner tempo
//! is estimated from the reference's mean inter-onset interval; the file's
//! own tempo is used when that estimate is unavailable.
//!
//! Usage: `cargo run --example align_midi -- reference.mid performance.mid [config.toml]`

use log::{error, info};
use reprise::config::EngineConfig;
use reprise::midi::{MidiNoteSource, estimate_bpm};
use reprise::report::{AlignmentReport, SimilarityReport};

const READ_ATTEMPTS: usize = 2;
const SIMILARITY_THRESHOLD: f64 = 70.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        error!("usage: align_midi <reference.mid> <performance.mid> [config.toml]");
        std::process::exit(2);
    }

    let config = match args.get(2) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let source = MidiNoteSource::new(config.aligner.convention);
    let reference = source.load_with_retry(&args[0], READ_ATTEMPTS)?;
    let performance = source.load_with_retry(&args[1], READ_ATTEMPTS)?;

    info!("Reference:   {}", args[0]);
    info!("Performance: {}", args[1]);
    info!(
        "Notes Count: {} vs {}",
        reference.notes.len(),
        performance.notes.len()
    );
    let bpm = estimate_bpm(&reference.notes).unwrap_or_else(|| reference.bpm());
    info!("Reference tempo: {:.1} bpm (file: {:.1})", bpm, reference.bpm());

    let matches = config
        .aligner()
        .align(&reference.notes, &performance.notes, bpm)?;
    info!("\n{}", AlignmentReport::new(&matches));

    let search = config.segment_finder().find(
        &reference.notes,
        &performance.notes,
        SIMILARITY_THRESHOLD,
    )?;
    info!("\n{}", SimilarityReport::new(&search));

    Ok(())
}
