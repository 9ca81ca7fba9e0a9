//! Edge case tests for boundary conditions and unusual inputs.
//!
//! Tests cover:
//! - Empty sequences
//! - Single notes
//! - Malformed notes

use reprise::align::{MatchStage, NoteAligner};
use reprise::feature::relative_features;
use reprise::note::{DurationConvention, NoteEvent, validate_notes};
use reprise::segment::SegmentFinder;

fn scale() -> Vec<NoteEvent> {
    [60, 62, 64, 65, 67, 69, 71, 72]
        .iter()
        .enumerate()
        .map(|(i, &p)| NoteEvent::new(i as f64 * 0.5, p, 0.5))
        .collect()
}

// Empty Sequence Tests

#[test]
fn align_empty_candidate() {
    let results = NoteAligner::default().align(&scale(), &[], 120.0).unwrap();
    assert!(results.is_empty());
}

#[test]
fn align_empty_reference() {
    let candidate = scale();
    let results = NoteAligner::default().align(&[], &candidate, 120.0).unwrap();
    assert_eq!(results.len(), candidate.len());
    assert!(results.iter().all(|r| r.stage == MatchStage::Unmatched));
}

#[test]
fn segments_empty_candidate() {
    let search = SegmentFinder::default().find(&scale(), &[], 70.0).unwrap();
    assert!(search.segments.is_empty());
    assert!(!search.fallback_used());
}

#[test]
fn segments_both_empty() {
    let search = SegmentFinder::default().find(&[], &[], 0.0).unwrap();
    assert!(search.segments.is_empty());
}

#[test]
fn features_empty() {
    assert!(relative_features(&[], DurationConvention::Absolute, 0.5).is_empty());
}

// Single Note Tests

#[test]
fn align_single_notes() {
    let one = [NoteEvent::new(0.0, 60, 0.5)];
    let results = NoteAligner::default().align(&one, &one, 120.0).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].stage, MatchStage::FirstPass);
    assert_eq!(results[0].alignment_score, 0.0);
}

#[test]
fn segments_single_note() {
    let one = [NoteEvent::new(0.0, 60, 0.5)];
    let search = SegmentFinder::default().find(&one, &scale(), 0.0).unwrap();
    assert!(search.segments.is_empty());
}

// Transposition

#[test]
fn transposed_candidate_still_aligns() {
    let reference = scale();
    let candidate: Vec<_> = reference
        .iter()
        .map(|n| NoteEvent { pitch: n.pitch + 5, ..*n })
        .collect();
    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();
    assert!(results.iter().all(|r| r.stage == MatchStage::FirstPass));

    let search = SegmentFinder::default()
        .find(&reference, &candidate, 70.0)
        .unwrap();
    assert_eq!(search.segments.len(), 1);
    assert_eq!(search.segments[0].length, reference.len());
}

// Malformed Notes

#[test]
fn zero_duration_rejected_upstream() {
    let mut notes = scale();
    notes[3].duration = 0.0;
    assert!(validate_notes(&notes).is_err());
}

#[test]
fn negative_onset_rejected() {
    let notes = [NoteEvent::new(-1.0, 60, 0.5)];
    assert!(validate_notes(&notes).is_err());
}

#[test]
fn nan_duration_rejected() {
    let notes = [NoteEvent::new(0.0, 60, f64::NAN)];
    assert!(validate_notes(&notes).is_err());
}
