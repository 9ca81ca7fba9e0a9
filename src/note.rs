//! Symbolic note events as handed to the engine by a note source.

use serde::{Deserialize, Serialize};

/// How the `duration` field of a [`NoteEvent`] is expressed.
///
/// The convention is fixed once per alignment run and applied to both
/// sequences being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationConvention {
    /// Durations are tempo-normalized note values in beats.
    Musical,
    /// Durations are absolute seconds.
    #[default]
    Absolute,
}

/// A single sounded note.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset time in seconds.
    pub start: f64,
    /// MIDI key number.
    pub pitch: i32,
    /// Duration in seconds or beats, see [`DurationConvention`].
    pub duration: f64,
    pub channel: u8,
    /// Beats per minute in force at the onset.
    pub tempo: f64,
}

impl NoteEvent {
    pub fn new(start: f64, pitch: i32, duration: f64) -> Self {
        Self {
            start,
            pitch,
            duration,
            channel: 0,
            tempo: 120.0,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    /// Seconds per beat at this note's tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo
    }
}

/// Signed pitch intervals between consecutive notes (`len - 1` entries).
///
/// # Example
/// ```
/// use reprise::note::{pitch_intervals, NoteEvent};
///
/// let notes: Vec<NoteEvent> = [60, 62, 61]
///     .iter()
///     .enumerate()
///     .map(|(i, &p)| NoteEvent::new(i as f64, p, 1.0))
///     .collect();
/// assert_eq!(pitch_intervals(&notes), vec![2, -1]);
/// ```
pub fn pitch_intervals(notes: &[NoteEvent]) -> Vec<i32> {
    notes.windows(2).map(|w| w[1].pitch - w[0].pitch).collect()
}

/// Check that every note can be aligned safely.
///
/// Rejects non-finite onsets, zero/negative/non-finite durations and
/// non-positive tempos. Zero durations would make the tempo correction
/// ratio undefined, so note sources call this before handing notes over.
pub fn validate_notes(notes: &[NoteEvent]) -> crate::Result<()> {
    for (index, note) in notes.iter().enumerate() {
        if !note.start.is_finite() || note.start < 0.0 {
            return Err(crate::Error::InvalidNote {
                index,
                reason: "onset must be finite and non-negative",
            });
        }
        if !note.duration.is_finite() || note.duration <= 0.0 {
            return Err(crate::Error::InvalidNote {
                index,
                reason: "duration must be finite and positive",
            });
        }
        if !note.tempo.is_finite() || note.tempo <= 0.0 {
            return Err(crate::Error::InvalidNote {
                index,
                reason: "tempo must be finite and positive",
            });
        }
    }
    Ok(())
}
