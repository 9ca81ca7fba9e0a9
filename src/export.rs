//! Segment export: slicing matched passages and writing them to a MIDI file.

use crate::note::{DurationConvention, NoteEvent};
use crate::segment::MatchSegment;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

/// Resolution of exported files.
pub const EXPORT_TICKS_PER_BEAT: u16 = 480;

const EXPORT_VELOCITY: u8 = 100;

/// Candidate notes covered by `segment`, clipped to the sequence.
pub fn slice_candidate<'a>(notes: &'a [NoteEvent], segment: &MatchSegment) -> &'a [NoteEvent] {
    clip(notes, segment.candidate_start, segment.length)
}

/// Reference notes covered by `segment`, clipped to the sequence.
pub fn slice_reference<'a>(notes: &'a [NoteEvent], segment: &MatchSegment) -> &'a [NoteEvent] {
    clip(notes, segment.reference_start, segment.length)
}

fn clip(notes: &[NoteEvent], start: usize, length: usize) -> &[NoteEvent] {
    let start = start.min(notes.len());
    let end = start.saturating_add(length).min(notes.len());
    &notes[start..end]
}

/// Encode a passage as a single-track Standard MIDI File.
///
/// The passage is shifted so that its first note starts at tick 0; the
/// first note's tempo becomes the file tempo. Pitches outside `0..=127`
/// are clamped.
///
/// # Errors
/// * `Error::NoNotes` for an empty passage
/// * `Error::InvalidNote` if a note fails [`crate::note::validate_notes`]
/// * `Error::InvalidParameter` if the tempo or a gap between events does not
///   fit the file's 24-bit tempo or 28-bit delta fields
pub fn passage_to_smf_bytes(
    notes: &[NoteEvent],
    convention: DurationConvention,
) -> crate::Result<Vec<u8>> {
    let Some(first) = notes.first() else {
        return Err(crate::Error::NoNotes);
    };
    crate::note::validate_notes(notes)?;

    let bpm = first.tempo;
    let tpb = f64::from(EXPORT_TICKS_PER_BEAT);
    let to_ticks = |seconds: f64| (seconds * bpm / 60.0 * tpb).round().max(0.0) as u64;

    // (tick, is_on, pitch, channel); offs sort before ons at the same tick
    let mut timeline: Vec<(u64, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let start = to_ticks(note.start - first.start);
        let length = match convention {
            DurationConvention::Absolute => to_ticks(note.duration),
            DurationConvention::Musical => (note.duration * tpb).round() as u64,
        }
        .max(1);
        let pitch = note.pitch.clamp(0, 127) as u8;
        let channel = note.channel.min(15);
        timeline.push((start, true, pitch, channel));
        timeline.push((start + length, false, pitch, channel));
    }
    timeline.sort_by_key(|&(tick, on, pitch, _)| (tick, on, pitch));

    let micros_per_beat = (60_000_000.0 / bpm).round();
    let Some(tempo) = u32::try_from(micros_per_beat as u64)
        .ok()
        .and_then(u24::try_from)
    else {
        return Err(crate::Error::invalid_parameter(
            "tempo",
            bpm,
            "too slow to encode as a MIDI tempo",
        ));
    };
    let mut track = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo)),
    }];
    let mut last_tick = 0u64;
    for (tick, on, pitch, channel) in timeline {
        let Some(delta) = u32::try_from(tick - last_tick).ok().and_then(u28::try_from) else {
            return Err(crate::Error::invalid_parameter(
                "start",
                tick,
                "gap between events too long to encode as a MIDI delta time",
            ));
        };
        last_tick = tick;
        let key = u7::new(pitch);
        let message = if on {
            MidiMessage::NoteOn {
                key,
                vel: u7::new(EXPORT_VELOCITY),
            }
        } else {
            MidiMessage::NoteOff { key, vel: u7::new(0) }
        };
        track.push(TrackEvent {
            delta,
            kind: TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
        });
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(EXPORT_TICKS_PER_BEAT)),
        ),
        tracks: vec![track],
    };
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Write a passage (typically [`slice_candidate`] output) to `path`.
pub fn write_passage<P: AsRef<Path>>(
    notes: &[NoteEvent],
    convention: DurationConvention,
    path: P,
) -> crate::Result<()> {
    let bytes = passage_to_smf_bytes(notes, convention)?;
    std::fs::write(path.as_ref(), bytes)?;
    log::info!("wrote {} notes to {}", notes.len(), path.as_ref().display());
    Ok(())
}
