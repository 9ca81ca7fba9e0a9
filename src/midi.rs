//! Standard MIDI File note source and tempo source.

use crate::note::{DurationConvention, NoteEvent};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::BTreeMap;
use std::path::Path;

/// Microseconds per quarter note when a file carries no tempo event (120 BPM).
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
}

impl TempoChange {
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / f64::from(self.microseconds_per_beat)
    }
}

/// Tempo changes of a file, sorted by tick, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    ticks_per_beat: u16,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    pub fn new(ticks_per_beat: u16, mut changes: Vec<TempoChange>) -> Self {
        changes.retain(|c| c.microseconds_per_beat > 0);
        changes.sort_by_key(|c| c.tick);
        // Keep the last change written at a given tick
        changes.reverse();
        changes.dedup_by_key(|c| c.tick);
        changes.reverse();
        if changes.first().map_or(true, |c| c.tick > 0) {
            changes.insert(
                0,
                TempoChange {
                    tick: 0,
                    microseconds_per_beat: DEFAULT_MICROS_PER_BEAT,
                },
            );
        }
        Self {
            ticks_per_beat: ticks_per_beat.max(1),
            changes,
        }
    }

    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Tempo at the start of the file.
    pub fn initial_bpm(&self) -> f64 {
        self.changes[0].bpm()
    }

    fn change_at_tick(&self, tick: u64) -> &TempoChange {
        let idx = self.changes.partition_point(|c| c.tick <= tick);
        &self.changes[idx.saturating_sub(1)]
    }

    pub fn bpm_at_tick(&self, tick: u64) -> f64 {
        self.change_at_tick(tick).bpm()
    }

    /// Tempo in force at `seconds` from the start of the file.
    pub fn bpm_at(&self, seconds: f64) -> f64 {
        let mut current = &self.changes[0];
        for change in &self.changes[1..] {
            if self.tick_to_seconds(change.tick) > seconds {
                break;
            }
            current = change;
        }
        current.bpm()
    }

    /// Convert a tick position to seconds by integrating over the tempo map.
    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        let tpb = f64::from(self.ticks_per_beat);
        let mut seconds = 0.0;
        let mut last_tick = 0u64;
        let mut usec_per_beat = f64::from(DEFAULT_MICROS_PER_BEAT);

        for change in &self.changes {
            if change.tick >= tick {
                break;
            }
            let delta_ticks = change.tick - last_tick;
            seconds += (delta_ticks as f64 / tpb) * (usec_per_beat / 1_000_000.0);
            last_tick = change.tick;
            usec_per_beat = f64::from(change.microseconds_per_beat);
        }

        let delta_ticks = tick - last_tick;
        seconds + (delta_ticks as f64 / tpb) * (usec_per_beat / 1_000_000.0)
    }
}

/// Notes extracted from a file together with its tempo map.
#[derive(Debug, Clone)]
pub struct MidiNotes {
    pub notes: Vec<NoteEvent>,
    pub tempo_map: TempoMap,
}

impl MidiNotes {
    /// Governing tempo: the tempo in force when the file starts.
    pub fn bpm(&self) -> f64 {
        self.tempo_map.initial_bpm()
    }
}

/// Extracts [`NoteEvent`]s from Standard MIDI Files.
///
/// # Example
/// ```no_run
/// use reprise::midi::MidiNoteSource;
/// use reprise::note::DurationConvention;
///
/// let source = MidiNoteSource::new(DurationConvention::Musical).with_channel(0);
/// let extracted = source.load("reference.mid").unwrap();
/// println!("{} notes at {} bpm", extracted.notes.len(), extracted.bpm());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MidiNoteSource {
    pub convention: DurationConvention,
    /// Only keep notes on this channel.
    pub channel: Option<u8>,
}

impl MidiNoteSource {
    pub fn new(convention: DurationConvention) -> Self {
        Self {
            convention,
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> crate::Result<MidiNotes> {
        let data = std::fs::read(path)?;
        self.parse(&data)
    }

    /// Like [`load`](Self::load) but re-reads the file up to `attempts`
    /// times when reading fails. Decoding errors are not retried.
    pub fn load_with_retry<P: AsRef<Path>>(
        &self,
        path: P,
        attempts: usize,
    ) -> crate::Result<MidiNotes> {
        let path = path.as_ref();
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match std::fs::read(path) {
                Ok(data) => return self.parse(&data),
                Err(err) if attempt < attempts => {
                    log::warn!(
                        "[retry {attempt}/{attempts}] reading {}: {err}",
                        path.display()
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Decode an in-memory Standard MIDI File.
    ///
    /// Notes come back ordered by onset, then pitch, then channel.
    ///
    /// # Errors
    /// * `Error::Midi` if the data is not a valid SMF
    /// * `Error::InvalidParameter` for SMPTE (timecode) timing
    /// * `Error::NoNotes` if no note with a positive duration was found
    pub fn parse(&self, data: &[u8]) -> crate::Result<MidiNotes> {
        let smf = Smf::parse(data)?;
        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(fps, subframe) => {
                return Err(crate::Error::invalid_parameter(
                    "timing",
                    format!("{} fps / {subframe}", fps.as_int()),
                    "SMPTE timecode files are not supported",
                ));
            }
        };

        let mut tempo_changes = Vec::new();
        for track in &smf.tracks {
            let mut tick = 0u64;
            for event in track {
                tick += u64::from(event.delta.as_int());
                if let TrackEventKind::Meta(MetaMessage::Tempo(t)) = event.kind {
                    tempo_changes.push(TempoChange {
                        tick,
                        microseconds_per_beat: t.as_int(),
                    });
                }
            }
        }
        let tempo_map = TempoMap::new(ticks_per_beat, tempo_changes);

        let mut spans = Vec::new();
        for track in &smf.tracks {
            collect_note_spans(track, &mut spans);
        }

        let mut notes = Vec::with_capacity(spans.len());
        let mut dropped = 0usize;
        for span in spans {
            if self.channel.is_some_and(|ch| ch != span.channel) {
                continue;
            }
            let start = tempo_map.tick_to_seconds(span.start_tick);
            let seconds = tempo_map.tick_to_seconds(span.end_tick) - start;
            if seconds <= 0.0 {
                dropped += 1;
                continue;
            }
            let bpm = tempo_map.bpm_at_tick(span.start_tick);
            let duration = match self.convention {
                DurationConvention::Absolute => seconds,
                DurationConvention::Musical => seconds * bpm / 60.0,
            };
            notes.push(NoteEvent {
                start,
                pitch: i32::from(span.pitch),
                duration,
                channel: span.channel,
                tempo: bpm,
            });
        }

        if dropped > 0 {
            log::warn!("dropped {dropped} notes with zero duration");
        }
        if notes.is_empty() {
            return Err(crate::Error::NoNotes);
        }

        notes.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then(a.pitch.cmp(&b.pitch))
                .then(a.channel.cmp(&b.channel))
        });
        log::debug!(
            "extracted {} notes, {} tempo changes, {} ticks per beat",
            notes.len(),
            tempo_map.changes().len(),
            ticks_per_beat
        );
        Ok(MidiNotes { notes, tempo_map })
    }
}

struct NoteSpan {
    pitch: u8,
    channel: u8,
    start_tick: u64,
    end_tick: u64,
}

/// Pair each note-on with the next note-off of the same key and channel.
fn collect_note_spans(track: &[midly::TrackEvent<'_>], spans: &mut Vec<NoteSpan>) {
    let mut tick = 0u64;
    let mut active: BTreeMap<(u8, u8), u64> = BTreeMap::new();

    for event in track {
        tick += u64::from(event.delta.as_int());
        let TrackEventKind::Midi { channel, message } = event.kind else {
            continue;
        };
        let channel = channel.as_int();
        let (pitch, on) = match message {
            MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int() > 0),
            MidiMessage::NoteOff { key, .. } => (key.as_int(), false),
            _ => continue,
        };

        // A note-on for a sounding key ends the previous note (re-strike)
        if let Some(start_tick) = active.remove(&(pitch, channel)) {
            spans.push(NoteSpan {
                pitch,
                channel,
                start_tick,
                end_tick: tick,
            });
        }
        if on {
            active.insert((pitch, channel), tick);
        }
    }

    for ((pitch, channel), start_tick) in active {
        spans.push(NoteSpan {
            pitch,
            channel,
            start_tick,
            end_tick: tick,
        });
    }
}

/// Estimate a tempo from the mean inter-onset interval: `60 / mean_ioi`.
///
/// Returns `None` for fewer than two notes or when the onsets do not advance.
pub fn estimate_bpm(notes: &[NoteEvent]) -> Option<f64> {
    let (first, last) = (notes.first()?, notes.last()?);
    if notes.len() < 2 {
        return None;
    }
    let mean_interval = (last.start - first.start) / (notes.len() - 1) as f64;
    (mean_interval > 0.0).then(|| 60.0 / mean_interval)
}
