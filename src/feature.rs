//! Relative note features: pitch interval, normalized duration, relative onset.

use crate::note::{DurationConvention, NoteEvent};
use ndarray::Array2;

/// Number of scalar components in a [`RelativeFeature`].
pub const FEATURE_DIM: usize = 3;

/// A note described relative to its predecessor and to the first onset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeFeature {
    /// `pitch[i] - pitch[i - 1]`, 0 for the first note.
    pub pitch_interval: i32,
    /// Duration in beats.
    pub normalized_duration: f64,
    /// `start[i] - start[0]` in seconds.
    pub relative_start: f64,
}

impl RelativeFeature {
    pub fn to_array(&self) -> [f64; FEATURE_DIM] {
        [
            f64::from(self.pitch_interval),
            self.normalized_duration,
            self.relative_start,
        ]
    }
}

/// Express a note's duration in beats.
///
/// Musical durations are already in beats; absolute durations are divided
/// by `seconds_per_beat`.
#[inline]
pub fn normalize_duration(
    duration: f64,
    convention: DurationConvention,
    seconds_per_beat: f64,
) -> f64 {
    match convention {
        DurationConvention::Musical => duration,
        DurationConvention::Absolute => duration / seconds_per_beat,
    }
}

/// Convert an absolute note sequence into relative features.
///
/// # Arguments
/// * `notes` - Onset-ordered notes (may be empty)
/// * `convention` - How `NoteEvent::duration` is expressed
/// * `seconds_per_beat` - Used only for [`DurationConvention::Absolute`]
///
/// # Returns
/// One feature per note, same index alignment.
///
/// # Example
/// ```
/// use reprise::feature::relative_features;
/// use reprise::note::{DurationConvention, NoteEvent};
///
/// let notes = vec![NoteEvent::new(1.0, 60, 0.5), NoteEvent::new(1.5, 64, 0.25)];
/// let rel = relative_features(&notes, DurationConvention::Absolute, 0.5);
/// assert_eq!(rel[0].pitch_interval, 0);
/// assert_eq!(rel[1].pitch_interval, 4);
/// assert_eq!(rel[1].normalized_duration, 0.5);
/// assert_eq!(rel[1].relative_start, 0.5);
/// ```
pub fn relative_features(
    notes: &[NoteEvent],
    convention: DurationConvention,
    seconds_per_beat: f64,
) -> Vec<RelativeFeature> {
    let Some(first) = notes.first() else {
        return Vec::new();
    };

    let mut features = Vec::with_capacity(notes.len());
    let mut prev_pitch = first.pitch;
    for note in notes {
        features.push(RelativeFeature {
            pitch_interval: note.pitch - prev_pitch,
            normalized_duration: normalize_duration(note.duration, convention, seconds_per_beat),
            relative_start: note.start - first.start,
        });
        prev_pitch = note.pitch;
    }
    features
}

/// Mean normalized duration, 0 for an empty sequence.
pub fn mean_duration(features: &[RelativeFeature]) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    features.iter().map(|f| f.normalized_duration).sum::<f64>() / features.len() as f64
}

/// The note at `index` plus up to `radius` neighbours on each side,
/// clipped at the sequence boundaries.
pub fn context_window(
    features: &[RelativeFeature],
    index: usize,
    radius: usize,
) -> &[RelativeFeature] {
    if features.is_empty() {
        return features;
    }
    let index = index.min(features.len() - 1);
    let lo = index.saturating_sub(radius);
    let hi = (index + radius + 1).min(features.len());
    &features[lo..hi]
}

/// Stack features column-wise into a `(FEATURE_DIM, n)` matrix for DTW.
pub fn feature_matrix(features: &[RelativeFeature]) -> Array2<f64> {
    Array2::from_shape_fn((FEATURE_DIM, features.len()), |(k, i)| {
        features[i].to_array()[k]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scale(pitches: &[i32]) -> Vec<NoteEvent> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| NoteEvent::new(2.0 + i as f64 * 0.5, p, 0.25))
            .collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(relative_features(&[], DurationConvention::Musical, 0.5).is_empty());
        assert_eq!(mean_duration(&[]), 0.0);
    }

    #[test]
    fn first_feature_is_anchored() {
        let rel = relative_features(&scale(&[60, 67, 65]), DurationConvention::Musical, 0.5);
        assert_eq!(rel.len(), 3);
        assert_eq!(rel[0].pitch_interval, 0);
        assert_eq!(rel[0].relative_start, 0.0);
        assert_eq!(rel[1].pitch_interval, 7);
        assert_eq!(rel[2].pitch_interval, -2);
        assert_relative_eq!(rel[2].relative_start, 1.0);
    }

    #[test]
    fn absolute_durations_are_converted_to_beats() {
        let rel = relative_features(&scale(&[60, 62]), DurationConvention::Absolute, 0.5);
        assert_relative_eq!(rel[0].normalized_duration, 0.5);
        let musical = relative_features(&scale(&[60, 62]), DurationConvention::Musical, 0.5);
        assert_relative_eq!(musical[0].normalized_duration, 0.25);
    }

    #[test]
    fn context_window_is_clipped() {
        let rel = relative_features(&scale(&[60, 62, 64, 65]), DurationConvention::Musical, 0.5);
        assert_eq!(context_window(&rel, 0, 1).len(), 2);
        assert_eq!(context_window(&rel, 1, 1).len(), 3);
        assert_eq!(context_window(&rel, 3, 1).len(), 2);
        assert_eq!(context_window(&rel, 1, 1)[0].pitch_interval, 0);
        assert_eq!(context_window(&rel[..1], 0, 1).len(), 1);
    }

    #[test]
    fn feature_matrix_layout() {
        let rel = relative_features(&scale(&[60, 64]), DurationConvention::Musical, 0.5);
        let m = feature_matrix(&rel);
        assert_eq!(m.shape(), &[FEATURE_DIM, 2]);
        assert_relative_eq!(m[(0, 1)], 4.0);
        assert_relative_eq!(m[(1, 1)], 0.25);
        assert_relative_eq!(m[(2, 1)], 0.5);
    }
}
