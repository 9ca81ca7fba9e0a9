//! Plain-text reports for alignment and similarity results.

use crate::align::MatchResult;
use crate::segment::SegmentSearch;
use std::fmt;

/// Segments shorter than this are left out of the similarity report.
pub const MIN_REPORTED_SEGMENT_LENGTH: usize = 3;

/// Note alignment table, one row per candidate note.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentReport<'a> {
    pub matches: &'a [MatchResult],
}

impl<'a> AlignmentReport<'a> {
    pub fn new(matches: &'a [MatchResult]) -> Self {
        Self { matches }
    }
}

impl fmt::Display for AlignmentReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============= Note Alignment Report =============")?;
        writeln!(
            f,
            "{:<6}{:<12}{:<14}{:<10}Match Stage",
            "#", "Ref Pitch", "Perf Pitch", "Ratio"
        )?;
        writeln!(f, "-------------------------------------------------")?;
        for m in self.matches {
            let reference = m
                .reference_note
                .map_or_else(|| "-".to_owned(), |n| n.pitch.to_string());
            writeln!(
                f,
                "{:<6}{:<12}{:<14}{:<10.2}{}",
                m.order, reference, m.candidate_note.pitch, m.tempo_correction_ratio, m.stage
            )?;
        }
        write!(f, "=================================================")
    }
}

/// Repeated-segment table.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityReport<'a> {
    pub search: &'a SegmentSearch,
    pub min_length: usize,
}

impl<'a> SimilarityReport<'a> {
    pub fn new(search: &'a SegmentSearch) -> Self {
        Self {
            search,
            min_length: MIN_REPORTED_SEGMENT_LENGTH,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

impl fmt::Display for SimilarityReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============= Similarity Analysis =============")?;
        match self.search.fallback {
            Some(convention) => writeln!(f, "[Fallback Triggered] Yes ({convention:?})")?,
            None => writeln!(f, "[Fallback Triggered] No")?,
        }
        writeln!(f, "Ref Start\tPerf Start\tLength\tSimilarity")?;
        writeln!(f, "-----------------------------------------------")?;
        for seg in &self.search.segments {
            if seg.length < self.min_length {
                continue;
            }
            writeln!(
                f,
                "{}\t\t{}\t\t{}\t{:.1}%",
                seg.reference_start, seg.candidate_start, seg.length, seg.similarity_score
            )?;
        }
        write!(f, "===============================================")
    }
}
