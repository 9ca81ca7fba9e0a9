//! Two-round note matcher.
//!
//! Each candidate note is paired with at most one reference note. The first
//! round only admits reference notes with the same pitch interval whose
//! duration and relative onset are close; the second round drops the
//! duration/position gates and tolerates a pitch interval off by one
//! semitone. Within a round the reference note whose ±1-note context
//! window has the smallest DTW distance wins.

use crate::feature::{self, RelativeFeature};
use crate::note::{DurationConvention, NoteEvent};
use crate::utils::dtw_distance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which round claimed a candidate note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStage {
    FirstPass,
    SecondPass,
    Unmatched,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStage::FirstPass => "Round1",
            MatchStage::SecondPass => "Round2",
            MatchStage::Unmatched => "Unmatched",
        })
    }
}

/// Correspondence found for one candidate note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Index of the candidate note.
    pub order: usize,
    pub candidate_note: NoteEvent,
    /// Index of the matched reference note.
    pub reference_index: Option<usize>,
    pub reference_note: Option<NoteEvent>,
    /// Factor by which the candidate timing must be scaled to fit the reference.
    pub tempo_correction_ratio: f64,
    /// Context-window DTW distance, NaN when unmatched.
    pub alignment_score: f64,
    pub stage: MatchStage,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        self.stage != MatchStage::Unmatched
    }
}

/// Ordering of the result list returned by [`NoteAligner::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Ascending candidate index.
    #[default]
    CandidateIndex,
    /// First-pass matches, then second-pass matches, then unmatched notes,
    /// each group by ascending candidate index.
    Stage,
}

/// Tolerances for the two-round matcher.
///
/// # Example
/// ```
/// use reprise::align::AlignerConfig;
///
/// let config = AlignerConfig::new()
///     .with_duration_tolerance_ratio(0.2)
///     .with_position_tolerance(1.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// First round: maximum duration difference as a fraction of the mean
    /// reference duration.
    pub duration_tolerance_ratio: f64,
    /// First round: maximum difference of relative onsets, in seconds.
    pub position_tolerance: f64,
    /// Second round: maximum pitch interval difference, in semitones.
    pub relaxed_interval_tolerance: u32,
    /// Neighbours on each side included in a context window.
    pub context_radius: usize,
    /// How `NoteEvent::duration` is expressed for both sequences.
    pub convention: DurationConvention,
    pub result_order: ResultOrder,
}

impl AlignerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_tolerance_ratio(mut self, ratio: f64) -> Self {
        self.duration_tolerance_ratio = ratio;
        self
    }

    pub fn with_position_tolerance(mut self, seconds: f64) -> Self {
        self.position_tolerance = seconds;
        self
    }

    pub fn with_relaxed_interval_tolerance(mut self, semitones: u32) -> Self {
        self.relaxed_interval_tolerance = semitones;
        self
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    pub fn with_convention(mut self, convention: DurationConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_result_order(mut self, order: ResultOrder) -> Self {
        self.result_order = order;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.duration_tolerance_ratio.is_finite() || self.duration_tolerance_ratio < 0.0 {
            return Err(crate::Error::invalid_parameter(
                "duration_tolerance_ratio",
                self.duration_tolerance_ratio,
                "must be finite and non-negative",
            ));
        }
        if !self.position_tolerance.is_finite() || self.position_tolerance < 0.0 {
            return Err(crate::Error::invalid_parameter(
                "position_tolerance",
                self.position_tolerance,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            duration_tolerance_ratio: 0.3,
            position_tolerance: 0.5,
            relaxed_interval_tolerance: 1,
            context_radius: 1,
            convention: DurationConvention::Absolute,
            result_order: ResultOrder::CandidateIndex,
        }
    }
}

/// Two-round note matcher.
#[derive(Debug, Clone, Default)]
pub struct NoteAligner {
    config: AlignerConfig,
}

/// Per-run state: features of both sequences and ownership flags.
struct AlignRun<'a> {
    reference: &'a [NoteEvent],
    candidate: &'a [NoteEvent],
    ref_rel: Vec<RelativeFeature>,
    cand_rel: Vec<RelativeFeature>,
    ref_used: Vec<bool>,
    cand_used: Vec<bool>,
    radius: usize,
}

impl AlignRun<'_> {
    fn context_distance(&self, r_idx: usize, c_idx: usize) -> crate::Result<f64> {
        let ctx_ref = feature::context_window(&self.ref_rel, r_idx, self.radius);
        let ctx_cand = feature::context_window(&self.cand_rel, c_idx, self.radius);
        dtw_distance(
            &feature::feature_matrix(ctx_ref),
            &feature::feature_matrix(ctx_cand),
        )
    }

    /// Run one round over every unclaimed candidate note.
    fn pass<F>(
        &mut self,
        stage: MatchStage,
        admit: F,
        results: &mut Vec<MatchResult>,
    ) -> crate::Result<()>
    where
        F: Fn(&RelativeFeature, &RelativeFeature) -> bool,
    {
        for c_idx in 0..self.cand_rel.len() {
            if self.cand_used[c_idx] {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for r_idx in 0..self.ref_rel.len() {
                if self.ref_used[r_idx] || !admit(&self.ref_rel[r_idx], &self.cand_rel[c_idx]) {
                    continue;
                }
                let score = self.context_distance(r_idx, c_idx)?;
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((r_idx, score));
                }
            }

            if let Some((r_idx, score)) = best {
                self.ref_used[r_idx] = true;
                self.cand_used[c_idx] = true;
                results.push(MatchResult {
                    order: c_idx,
                    candidate_note: self.candidate[c_idx],
                    reference_index: Some(r_idx),
                    reference_note: Some(self.reference[r_idx]),
                    tempo_correction_ratio: self.ref_rel[r_idx].normalized_duration
                        / self.cand_rel[c_idx].normalized_duration,
                    alignment_score: score,
                    stage,
                });
            }
        }
        Ok(())
    }
}

impl NoteAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Match every candidate note against the reference.
    ///
    /// # Arguments
    /// * `reference` - Reference notes, onset-ordered
    /// * `candidate` - Candidate notes, onset-ordered
    /// * `bpm` - Tempo used to convert absolute durations into beats
    ///
    /// # Returns
    /// One [`MatchResult`] per candidate note, ordered per
    /// [`AlignerConfig::result_order`].
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` if `bpm` is not finite and positive
    /// or the configuration is invalid.
    ///
    /// Zero-duration notes make the tempo correction ratio undefined; reject
    /// them upstream with [`crate::note::validate_notes`].
    ///
    /// # Example
    /// ```
    /// use reprise::align::{MatchStage, NoteAligner};
    /// use reprise::note::NoteEvent;
    ///
    /// let reference = vec![NoteEvent::new(0.0, 60, 0.5), NoteEvent::new(0.5, 62, 0.5)];
    /// let candidate = vec![NoteEvent::new(0.0, 60, 0.5), NoteEvent::new(0.5, 62, 0.5)];
    /// let results = NoteAligner::default().align(&reference, &candidate, 120.0).unwrap();
    /// assert_eq!(results.len(), 2);
    /// assert!(results.iter().all(|r| r.stage == MatchStage::FirstPass));
    /// ```
    pub fn align(
        &self,
        reference: &[NoteEvent],
        candidate: &[NoteEvent],
        bpm: f64,
    ) -> crate::Result<Vec<MatchResult>> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(crate::Error::invalid_parameter(
                "bpm",
                bpm,
                "must be finite and positive",
            ));
        }
        self.config.validate()?;

        let seconds_per_beat = 60.0 / bpm;
        let convention = self.config.convention;
        let ref_rel = feature::relative_features(reference, convention, seconds_per_beat);
        let cand_rel = feature::relative_features(candidate, convention, seconds_per_beat);
        let ref_mean = feature::mean_duration(&ref_rel);

        let mut run = AlignRun {
            reference,
            candidate,
            ref_used: vec![false; ref_rel.len()],
            cand_used: vec![false; cand_rel.len()],
            ref_rel,
            cand_rel,
            radius: self.config.context_radius,
        };
        let mut results = Vec::with_capacity(candidate.len());

        let duration_tolerance = self.config.duration_tolerance_ratio * ref_mean;
        let position_tolerance = self.config.position_tolerance;
        run.pass(
            MatchStage::FirstPass,
            |r, c| {
                r.pitch_interval == c.pitch_interval
                    && (r.normalized_duration - c.normalized_duration).abs() <= duration_tolerance
                    && (r.relative_start - c.relative_start).abs() <= position_tolerance
            },
            &mut results,
        )?;
        let first_pass = results.len();

        let interval_tolerance = self.config.relaxed_interval_tolerance;
        run.pass(
            MatchStage::SecondPass,
            |r, c| r.pitch_interval.abs_diff(c.pitch_interval) <= interval_tolerance,
            &mut results,
        )?;
        let second_pass = results.len() - first_pass;

        for (c_idx, note) in candidate.iter().enumerate() {
            if !run.cand_used[c_idx] {
                results.push(MatchResult {
                    order: c_idx,
                    candidate_note: *note,
                    reference_index: None,
                    reference_note: None,
                    tempo_correction_ratio: 1.0,
                    alignment_score: f64::NAN,
                    stage: MatchStage::Unmatched,
                });
            }
        }

        log::debug!(
            "aligned {} candidate notes against {}: {} first pass, {} second pass, {} unmatched",
            candidate.len(),
            reference.len(),
            first_pass,
            second_pass,
            results.len() - first_pass - second_pass
        );

        // Results were pushed round by round; within a round by index.
        match self.config.result_order {
            ResultOrder::CandidateIndex => results.sort_by_key(|r| r.order),
            ResultOrder::Stage => results.sort_by_key(|r| (r.stage, r.order)),
        }
        Ok(results)
    }
}

/// Match with default tolerances.
pub fn align_notes(
    reference: &[NoteEvent],
    candidate: &[NoteEvent],
    bpm: f64,
    convention: DurationConvention,
) -> crate::Result<Vec<MatchResult>> {
    NoteAligner::new(AlignerConfig::default().with_convention(convention))
        .align(reference, candidate, bpm)
}
