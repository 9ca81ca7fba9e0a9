use approx::assert_relative_eq;
use reprise::align::{AlignerConfig, MatchStage, NoteAligner, ResultOrder};
use reprise::note::{DurationConvention, NoteEvent};

fn performance(pitches: &[i32], duration: f64, stretch: f64) -> Vec<NoteEvent> {
    pitches
        .iter()
        .enumerate()
        .map(|(i, &p)| NoteEvent::new(i as f64 * 0.5 * stretch, p, duration * stretch))
        .collect()
}

#[test]
fn slower_performance_matches_in_first_pass() {
    let pitches = [60, 62, 64, 65, 67];
    let reference = performance(&pitches, 0.5, 1.0);
    let candidate = performance(&pitches, 0.5, 1.1);

    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();

    assert_eq!(results.len(), 5);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.order, i);
        assert_eq!(r.stage, MatchStage::FirstPass);
        assert_eq!(r.reference_index, Some(i));
        assert_relative_eq!(r.tempo_correction_ratio, 1.0 / 1.1, epsilon = 1e-9);
        assert!(r.alignment_score.is_finite());
    }
}

#[test]
fn musical_convention_ignores_bpm_for_durations() {
    let pitches = [60, 62, 64, 65, 67];
    // Durations in beats
    let reference = performance(&pitches, 1.0, 1.0);
    let candidate = performance(&pitches, 1.0, 1.1);
    let aligner = NoteAligner::new(AlignerConfig::new().with_convention(DurationConvention::Musical));

    let slow = aligner.align(&reference, &candidate, 60.0).unwrap();
    let fast = aligner.align(&reference, &candidate, 180.0).unwrap();
    for (a, b) in slow.iter().zip(&fast) {
        assert_relative_eq!(a.tempo_correction_ratio, b.tempo_correction_ratio);
        assert_relative_eq!(a.tempo_correction_ratio, 1.0 / 1.1, epsilon = 1e-9);
    }
}

#[test]
fn every_candidate_appears_once() {
    let reference = performance(&[60, 64, 67, 72, 67, 64, 60], 0.5, 1.0);
    let candidate = performance(&[60, 64, 66, 72, 67, 63, 60, 55, 48], 0.4, 1.0);

    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();

    let mut orders: Vec<_> = results.iter().map(|r| r.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, (0..candidate.len()).collect::<Vec<_>>());

    let mut claimed: Vec<_> = results.iter().filter_map(|r| r.reference_index).collect();
    let total = claimed.len();
    claimed.sort_unstable();
    claimed.dedup();
    assert_eq!(claimed.len(), total, "a reference note was claimed twice");
    assert!(total <= reference.len());
}

#[test]
fn first_pass_matches_satisfy_relaxed_criterion() {
    let reference = performance(&[60, 62, 64, 62, 60, 67, 65], 0.5, 1.0);
    let candidate = performance(&[60, 62, 63, 62, 60, 67, 66], 0.5, 1.05);

    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();

    let interval = |notes: &[NoteEvent], i: usize| {
        if i == 0 {
            0
        } else {
            notes[i].pitch - notes[i - 1].pitch
        }
    };
    for r in results.iter().filter(|r| r.stage == MatchStage::FirstPass) {
        let ri = r.reference_index.unwrap();
        assert_eq!(interval(&reference, ri), interval(&candidate, r.order));
        assert!(interval(&reference, ri).abs_diff(interval(&candidate, r.order)) <= 1);
    }
    assert!(results.iter().any(|r| r.stage == MatchStage::SecondPass));
}

#[test]
fn stage_ordering_is_stable_by_index() {
    let reference = performance(&[60, 62, 64, 65], 0.5, 1.0);
    let candidate = performance(&[60, 61, 64, 65, 90, 91], 0.5, 1.0);
    let aligner = NoteAligner::new(AlignerConfig::new().with_result_order(ResultOrder::Stage));

    let results = aligner.align(&reference, &candidate, 120.0).unwrap();
    assert_eq!(results.len(), candidate.len());
    for pair in results.windows(2) {
        assert!(
            (pair[0].stage, pair[0].order) < (pair[1].stage, pair[1].order),
            "results out of order: {:?} then {:?}",
            pair[0].stage,
            pair[1].stage
        );
    }
}

#[test]
fn repeated_runs_are_identical() {
    let reference = performance(&[60, 62, 64, 62, 60, 59, 60], 0.5, 1.0);
    let candidate = performance(&[60, 62, 65, 62, 60, 60, 59, 60], 0.45, 1.0);
    let aligner = NoteAligner::default();

    let fingerprint = |results: &[reprise::align::MatchResult]| {
        results
            .iter()
            .map(|r| {
                (
                    r.order,
                    r.reference_index,
                    r.tempo_correction_ratio.to_bits(),
                    r.alignment_score.to_bits(),
                    r.stage,
                )
            })
            .collect::<Vec<_>>()
    };

    let a = aligner.align(&reference, &candidate, 120.0).unwrap();
    let b = aligner.align(&reference, &candidate, 120.0).unwrap();
    assert_eq!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn long_note_fails_duration_gate() {
    let reference = performance(&[60, 62, 64], 0.5, 1.0);
    let mut candidate = reference.clone();
    // Two beats against a one-beat reference mean, far past 0.3 of it
    candidate[1].duration = 1.0;

    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();

    assert_eq!(results[0].stage, MatchStage::FirstPass);
    assert_eq!(results[1].stage, MatchStage::SecondPass);
    assert_eq!(results[1].reference_index, Some(1));
    assert_eq!(results[2].stage, MatchStage::FirstPass);
    assert_eq!(results[2].reference_index, Some(2));
}

#[test]
fn late_note_fails_position_gate() {
    let reference = performance(&[60, 62, 64], 0.5, 1.0);
    let mut candidate = reference.clone();
    // Two seconds after the reference onset of the same note
    candidate[2].start = 3.0;

    let results = NoteAligner::default()
        .align(&reference, &candidate, 120.0)
        .unwrap();

    assert_eq!(results[1].stage, MatchStage::FirstPass);
    assert_eq!(results[1].reference_index, Some(1));
    assert_eq!(results[2].stage, MatchStage::SecondPass);
    assert_eq!(results[2].reference_index, Some(2));
}

#[test]
fn wider_gates_admit_in_first_pass() {
    let reference = performance(&[60, 62, 64], 0.5, 1.0);
    let mut candidate = reference.clone();
    candidate[1].duration = 1.0;
    candidate[2].start = 3.0;

    let aligner = NoteAligner::new(
        AlignerConfig::new()
            .with_duration_tolerance_ratio(1.5)
            .with_position_tolerance(2.5),
    );
    let results = aligner.align(&reference, &candidate, 120.0).unwrap();
    assert!(results.iter().all(|r| r.stage == MatchStage::FirstPass));
}
