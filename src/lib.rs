//! Note-level alignment and repeated-passage detection for symbolic music.
//!
//! Reprise compares a *candidate* performance against a *reference*
//! performance of the same piece, both given as onset-ordered note events.
//! It answers two questions:
//!
//! - which reference note each played note corresponds to, and by how much
//!   its timing must be scaled to fit the reference tempo
//!   ([`align::NoteAligner`]);
//! - which passages recur in both sequences and how closely their rhythm
//!   agrees ([`segment::SegmentFinder`]).
//!
//! # Quick Start
//!
//! ```rust
//! use reprise::align::{MatchStage, NoteAligner};
//! use reprise::note::NoteEvent;
//! use reprise::segment::SegmentFinder;
//!
//! let pitches = [60, 62, 64, 65, 67, 69];
//! let reference: Vec<NoteEvent> = pitches
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &p)| NoteEvent::new(i as f64 * 0.5, p, 0.5))
//!     .collect();
//! let candidate = reference.clone();
//!
//! let matches = NoteAligner::default().align(&reference, &candidate, 120.0).unwrap();
//! assert!(matches.iter().all(|m| m.stage == MatchStage::FirstPass));
//!
//! let search = SegmentFinder::default().find(&reference, &candidate, 70.0).unwrap();
//! assert_eq!(search.segments[0].length, 6);
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`note`] | Note events, duration conventions, validation |
//! | [`feature`] | Relative features and context windows |
//! | [`utils`] | Dynamic Time Warping |
//! | [`align`] | Two-round note matcher |
//! | [`segment`] | Interval-run repeated-segment finder |
//! | [`fallback`] | Sequential fallback matcher |
//! | [`midi`] | Standard MIDI File note and tempo source |
//! | [`export`] | Passage slicing and MIDI export |
//! | [`report`] | Plain-text reports |
//! | [`config`] | TOML engine configuration |
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Finding no match is not an error:
//! unmatched notes and empty segment lists are ordinary results.
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`.

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, Result};

pub mod align;
pub mod config;
pub mod export;
pub mod fallback;
pub mod feature;
pub mod midi;
pub mod note;
pub mod report;
pub mod segment;
pub mod utils;
