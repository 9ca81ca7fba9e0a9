//! Sequential fallback matcher.
//!
//! Used by the segment finder when no interval run is confident enough.
//! The reference is walked from its first note; for each candidate offset
//! the matcher looks for successive candidate stretches whose closing
//! pitch interval equals the next reference interval and whose accumulated
//! duration fits that reference note's duration.

use crate::note::{DurationConvention, NoteEvent};
use crate::segment::MatchSegment;
use serde::{Deserialize, Serialize};

/// Tolerances for the sequential fallback walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Relative tolerance on accumulated duration.
    pub rhythm_tolerance: f64,
    /// Absolute slack added on both sides of the tolerance band.
    pub epsilon: f64,
    /// Fewest matched reference steps needed to emit a segment.
    pub min_matched_pairs: usize,
    /// Similarity credited per matched step, capped at 100.
    pub score_per_pair: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            rhythm_tolerance: 0.15,
            epsilon: 0.01,
            min_matched_pairs: 2,
            score_per_pair: 50.0,
        }
    }
}

/// Durations under the selected convention.
///
/// Musical durations are used as-is. Absolute durations are treated as
/// note values at each note's own tempo and expressed in quarter
/// equivalents: `value * (60 / bpm) * 4`.
pub fn fallback_durations(notes: &[NoteEvent], convention: DurationConvention) -> Vec<f64> {
    notes
        .iter()
        .map(|n| match convention {
            DurationConvention::Musical => n.duration,
            DurationConvention::Absolute => n.duration * n.seconds_per_beat() * 4.0,
        })
        .collect()
}

/// Walk every candidate offset and append the segments found to `out`.
///
/// Emitted segments are anchored at reference index 0 and carry
/// `similarity = min(matched_pairs * score_per_pair, 100)`. Segments below
/// `threshold` are skipped.
///
/// # Returns
/// Number of segments appended.
pub fn sequential_matches(
    reference: &[NoteEvent],
    candidate: &[NoteEvent],
    convention: DurationConvention,
    config: &FallbackConfig,
    threshold: f64,
    out: &mut Vec<MatchSegment>,
) -> usize {
    let n = reference.len();
    let m = candidate.len();
    if n < 2 || m < 2 {
        return 0;
    }

    let ref_dur = fallback_durations(reference, convention);
    let cand_dur = fallback_durations(candidate, convention);
    let before = out.len();

    for start in 0..m - 1 {
        let mut r = 1;
        let mut c = start + 1;
        let mut pairs = 0;
        let mut last_end = start;

        while r < n && c < m {
            let target = ref_dur[r];
            let lower = target * (1.0 - config.rhythm_tolerance) - config.epsilon;
            let upper = target * (1.0 + config.rhythm_tolerance) + config.epsilon;
            let interval = reference[r].pitch - reference[r - 1].pitch;

            let mut accumulated = 0.0;
            let mut found = None;
            for k in c..m {
                accumulated += cand_dur[k];
                if accumulated > upper {
                    break;
                }
                if candidate[k].pitch - candidate[k - 1].pitch == interval && accumulated >= lower
                {
                    found = Some(k);
                    break;
                }
            }

            match found {
                Some(k) => {
                    pairs += 1;
                    r += 1;
                    c = k + 1;
                    last_end = k;
                }
                None => c += 1,
            }
        }

        if pairs >= config.min_matched_pairs.max(1) {
            let span = last_end - start + 1;
            let similarity = (pairs as f64 * config.score_per_pair).min(100.0);
            if similarity >= threshold {
                out.push(MatchSegment {
                    reference_start: 0,
                    candidate_start: start,
                    length: span.min(n),
                    similarity_score: similarity,
                });
            }
        }
    }

    out.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(pitches: &[i32], durations: &[f64]) -> Vec<NoteEvent> {
        let mut t = 0.0;
        pitches
            .iter()
            .zip(durations)
            .map(|(&p, &d)| {
                let n = NoteEvent::new(t, p, d);
                t += d;
                n
            })
            .collect()
    }

    #[test]
    fn absolute_durations_become_quarter_equivalents() {
        let n = vec![NoteEvent::new(0.0, 60, 0.5).with_tempo(120.0)];
        assert_eq!(fallback_durations(&n, DurationConvention::Absolute), vec![1.0]);
        assert_eq!(fallback_durations(&n, DurationConvention::Musical), vec![0.5]);
    }

    #[test]
    fn split_candidate_note_still_matches() {
        let reference = notes(&[60, 62, 64], &[1.0, 1.0, 1.0]);
        // The first note is re-struck, so the window for the second reference
        // note spans two candidate notes.
        let candidate = notes(&[60, 60, 62, 64], &[1.0, 0.5, 0.5, 1.0]);
        let mut out = Vec::new();
        let added = sequential_matches(
            &reference,
            &candidate,
            DurationConvention::Musical,
            &FallbackConfig::default(),
            0.0,
            &mut out,
        );
        assert!(added >= 1);
        let first = out.iter().find(|s| s.candidate_start == 0).unwrap();
        assert_eq!(first.reference_start, 0);
        assert_eq!(first.length, 3);
        assert_eq!(first.similarity_score, 100.0);
    }

    #[test]
    fn single_pair_is_not_enough() {
        let reference = notes(&[60, 62, 64], &[1.0, 1.0, 1.0]);
        let candidate = notes(&[60, 62, 50], &[1.0, 1.0, 1.0]);
        let mut out = Vec::new();
        let added = sequential_matches(
            &reference,
            &candidate,
            DurationConvention::Musical,
            &FallbackConfig::default(),
            0.0,
            &mut out,
        );
        assert_eq!(added, 0);
    }

    #[test]
    fn accumulated_duration_above_band_is_rejected() {
        let reference = notes(&[60, 62, 64], &[1.0, 1.0, 1.0]);
        let cfg = FallbackConfig::default();
        let walk = |candidate: &[NoteEvent], out: &mut Vec<MatchSegment>| {
            sequential_matches(&reference, candidate, DurationConvention::Musical, &cfg, 0.0, out)
        };
        let mut out = Vec::new();

        // Upper bound is 1.0 * 1.15 + 0.01; the intervals match but each
        // stretch is already too long at its first note.
        let stretched = notes(&[60, 62, 64], &[1.0, 1.2, 1.2]);
        assert_eq!(walk(&stretched, &mut out), 0);
        let doubled = notes(&[60, 62, 64], &[1.0, 2.0, 2.0]);
        assert_eq!(walk(&doubled, &mut out), 0);
        assert!(out.is_empty());

        let within = notes(&[60, 62, 64], &[1.0, 1.1, 1.1]);
        assert_eq!(walk(&within, &mut out), 1);
        assert_eq!(out[0].candidate_start, 0);
        assert_eq!(out[0].length, 3);
    }

    #[test]
    fn short_inputs_produce_nothing() {
        let one = notes(&[60], &[1.0]);
        let mut out = Vec::new();
        let cfg = FallbackConfig::default();
        assert_eq!(
            sequential_matches(&one, &one, DurationConvention::Musical, &cfg, 0.0, &mut out),
            0
        );
        assert!(out.is_empty());
    }
}
