//! Repeated-segment finder.
//!
//! Finds contiguous passages whose pitch intervals recur in both sequences
//! with a longest-common-run dynamic program, scores them by how well the
//! durations agree, and greedily keeps the longest non-overlapping ones.

use crate::fallback::{self, FallbackConfig};
use crate::note::{self, DurationConvention, NoteEvent};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A passage shared by the reference and candidate sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSegment {
    pub reference_start: usize,
    pub candidate_start: usize,
    /// Number of notes covered on each side.
    pub length: usize,
    /// Score in `[0, 100]`.
    pub similarity_score: f64,
}

impl MatchSegment {
    pub fn reference_range(&self) -> Range<usize> {
        self.reference_start..self.reference_start + self.length
    }

    pub fn candidate_range(&self) -> Range<usize> {
        self.candidate_start..self.candidate_start + self.length
    }

    /// Whether the two segments share a reference or a candidate index.
    pub fn overlaps(&self, other: &MatchSegment) -> bool {
        let a = self.reference_range();
        let b = other.reference_range();
        let c = self.candidate_range();
        let d = other.candidate_range();
        (a.start < b.end && b.start < a.end) || (c.start < d.end && d.start < c.end)
    }
}

/// Scoring and search parameters for [`SegmentFinder`].
///
/// # Example
/// ```
/// use reprise::segment::SegmentConfig;
///
/// let config = SegmentConfig::new().with_min_run_intervals(2).without_fallback();
/// assert_eq!(config.min_run_intervals, 2);
/// assert!(!config.enable_fallback);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Matching intervals a run needs before it becomes a candidate.
    pub min_run_intervals: usize,
    pub base_score_per_note: f64,
    /// Bonus per note whose duration agrees with the reference.
    pub rhythm_bonus: f64,
    /// Relative duration tolerance for the rhythm bonus.
    pub rhythm_tolerance: f64,
    /// Below this best score the fallback matcher takes over.
    pub confidence_threshold: f64,
    pub enable_fallback: bool,
    pub fallback: FallbackConfig,
}

impl SegmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_run_intervals(mut self, intervals: usize) -> Self {
        self.min_run_intervals = intervals;
        self
    }

    pub fn with_scoring(mut self, base_score_per_note: f64, rhythm_bonus: f64) -> Self {
        self.base_score_per_note = base_score_per_note;
        self.rhythm_bonus = rhythm_bonus;
        self
    }

    pub fn with_rhythm_tolerance(mut self, tolerance: f64) -> Self {
        self.rhythm_tolerance = tolerance;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.enable_fallback = true;
        self.fallback = fallback;
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.enable_fallback = false;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.min_run_intervals == 0 {
            return Err(crate::Error::invalid_parameter(
                "min_run_intervals",
                self.min_run_intervals,
                "must be at least 1",
            ));
        }
        if !self.rhythm_tolerance.is_finite() || self.rhythm_tolerance < 0.0 {
            return Err(crate::Error::invalid_parameter(
                "rhythm_tolerance",
                self.rhythm_tolerance,
                "must be finite and non-negative",
            ));
        }
        if !self.fallback.rhythm_tolerance.is_finite() || self.fallback.rhythm_tolerance < 0.0 {
            return Err(crate::Error::invalid_parameter(
                "fallback.rhythm_tolerance",
                self.fallback.rhythm_tolerance,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_run_intervals: 4,
            base_score_per_note: 10.0,
            rhythm_bonus: 5.0,
            rhythm_tolerance: 0.15,
            confidence_threshold: 50.0,
            enable_fallback: true,
            fallback: FallbackConfig::default(),
        }
    }
}

/// Outcome of a segment search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSearch {
    /// Index-disjoint segments by descending similarity.
    pub segments: Vec<MatchSegment>,
    /// Convention under which the fallback matcher produced the candidates,
    /// `None` when the interval runs were used.
    pub fallback: Option<DurationConvention>,
}

impl SegmentSearch {
    pub fn fallback_used(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Interval-run based repeated-segment finder.
#[derive(Debug, Clone, Default)]
pub struct SegmentFinder {
    config: SegmentConfig,
}

impl SegmentFinder {
    pub fn new(config: SegmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Duration-agreement score of two equally long note slices.
    ///
    /// `min(100, base * len + bonus * k)` where `k` counts notes whose
    /// duration is within `rhythm_tolerance` of the reference duration.
    pub fn segment_similarity(&self, reference: &[NoteEvent], candidate: &[NoteEvent]) -> f64 {
        let rhythm_matches = reference
            .iter()
            .zip(candidate)
            .filter(|(r, c)| (c.duration - r.duration).abs() <= self.config.rhythm_tolerance * r.duration)
            .count();
        let score = self.config.base_score_per_note * reference.len() as f64
            + self.config.rhythm_bonus * rhythm_matches as f64;
        score.min(100.0)
    }

    /// Every interval run of at least `min_run_intervals`, scored.
    ///
    /// A run that keeps growing yields one candidate per length reached.
    pub fn run_candidates(
        &self,
        reference: &[NoteEvent],
        candidate: &[NoteEvent],
        similarity_threshold: f64,
    ) -> Vec<MatchSegment> {
        let ref_intervals = note::pitch_intervals(reference);
        let cand_intervals = note::pitch_intervals(candidate);
        let n = ref_intervals.len();
        let m = cand_intervals.len();

        let mut candidates = Vec::new();
        if n == 0 || m == 0 {
            return candidates;
        }

        let mut dp = Array2::<usize>::zeros((n, m));
        for i in 0..n {
            for j in 0..m {
                if ref_intervals[i] != cand_intervals[j] {
                    continue;
                }
                let run = if i > 0 && j > 0 { dp[(i - 1, j - 1)] + 1 } else { 1 };
                dp[(i, j)] = run;
                if run < self.config.min_run_intervals {
                    continue;
                }

                let length = run + 1;
                let ref_start = i + 1 - run;
                let cand_start = j + 1 - run;
                if ref_start + length > reference.len() || cand_start + length > candidate.len() {
                    continue;
                }

                let similarity = self.segment_similarity(
                    &reference[ref_start..ref_start + length],
                    &candidate[cand_start..cand_start + length],
                );
                if similarity >= similarity_threshold {
                    candidates.push(MatchSegment {
                        reference_start: ref_start,
                        candidate_start: cand_start,
                        length,
                        similarity_score: similarity,
                    });
                }
            }
        }
        candidates
    }

    /// Find the repeated passages shared by both sequences.
    ///
    /// # Arguments
    /// * `reference` - Reference notes, onset-ordered
    /// * `candidate` - Candidate notes, onset-ordered
    /// * `similarity_threshold` - Minimum score (0 to 100) for a candidate
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` for a threshold outside `[0, 100]`
    /// or an invalid configuration. Finding nothing is not an error.
    ///
    /// # Example
    /// ```
    /// use reprise::segment::SegmentFinder;
    /// use reprise::note::NoteEvent;
    ///
    /// let pitches = [60, 62, 64, 65, 67, 69];
    /// let notes: Vec<NoteEvent> = pitches
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, &p)| NoteEvent::new(i as f64 * 0.5, p, 0.5))
    ///     .collect();
    /// let search = SegmentFinder::default().find(&notes, &notes, 70.0).unwrap();
    /// assert_eq!(search.segments.len(), 1);
    /// assert_eq!(search.segments[0].length, 6);
    /// assert!(!search.fallback_used());
    /// ```
    pub fn find(
        &self,
        reference: &[NoteEvent],
        candidate: &[NoteEvent],
        similarity_threshold: f64,
    ) -> crate::Result<SegmentSearch> {
        if !(0.0..=100.0).contains(&similarity_threshold) {
            return Err(crate::Error::invalid_parameter(
                "similarity_threshold",
                similarity_threshold,
                "must be within [0, 100]",
            ));
        }
        self.config.validate()?;

        let mut candidates = self.run_candidates(reference, candidate, similarity_threshold);
        log::debug!("{} interval-run candidates", candidates.len());

        let mut fallback = None;
        let confident = candidates
            .iter()
            .any(|c| c.similarity_score >= self.config.confidence_threshold);
        if !confident && self.config.enable_fallback {
            let mut recovered = Vec::new();
            for convention in [DurationConvention::Musical, DurationConvention::Absolute] {
                fallback::sequential_matches(
                    reference,
                    candidate,
                    convention,
                    &self.config.fallback,
                    similarity_threshold,
                    &mut recovered,
                );
                if !recovered.is_empty() {
                    fallback = Some(convention);
                    break;
                }
            }
            if recovered.is_empty() {
                log::debug!("fallback matcher found nothing");
            } else {
                log::warn!(
                    "no confident interval run, using {} fallback segments ({:?} durations)",
                    recovered.len(),
                    fallback
                );
                candidates = recovered;
            }
        }

        let segments = resolve_overlaps(candidates, reference.len(), candidate.len());
        log::info!(
            "found {} repeated segments ({} vs {} notes)",
            segments.len(),
            reference.len(),
            candidate.len()
        );
        Ok(SegmentSearch { segments, fallback })
    }
}

/// Greedily keep the longest segments whose indices are still free.
///
/// Candidates are tried by descending length, then descending similarity;
/// the survivors are returned by descending similarity.
pub fn resolve_overlaps(
    mut candidates: Vec<MatchSegment>,
    reference_len: usize,
    candidate_len: usize,
) -> Vec<MatchSegment> {
    candidates.sort_by(|a, b| {
        b.length
            .cmp(&a.length)
            .then(b.similarity_score.total_cmp(&a.similarity_score))
    });

    let mut ref_used = vec![false; reference_len];
    let mut cand_used = vec![false; candidate_len];
    let mut accepted = Vec::new();

    for seg in candidates {
        let free = seg.reference_range().end <= reference_len
            && seg.candidate_range().end <= candidate_len
            && seg.reference_range().all(|r| !ref_used[r])
            && seg.candidate_range().all(|c| !cand_used[c]);
        if !free {
            continue;
        }
        ref_used[seg.reference_range()].fill(true);
        cand_used[seg.candidate_range()].fill(true);
        accepted.push(seg);
    }

    accepted.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    accepted
}

/// Search with default scoring.
pub fn find_similar_segments(
    reference: &[NoteEvent],
    candidate: &[NoteEvent],
    similarity_threshold: f64,
) -> crate::Result<Vec<MatchSegment>> {
    Ok(SegmentFinder::default()
        .find(reference, candidate, similarity_threshold)?
        .segments)
}
