//! Pass 0: SMF Structural Parse
//!
//! Validates the header chunk, walks every track's event stream with running
//! status, and routes note events through per-track [`NoteStacks`]. Header
//! and chunk-tag problems are fatal; anomalies inside a track body are
//! skipped over and counted.

use crate::config::{Config, FilterConfig};
use crate::cursor::{describe_chunk_id, ByteCursor};
use crate::error::{Result, RiffError};
use crate::pairing::{NoteStacks, Release};
use crate::pattern::{PairedNote, RawTimedEvent};
use crate::state::{ImportDiagnostics, ImportState, SmfHeader, TrackSummary};

/// Resolution used when the header declares zero ticks per quarter note
pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;

const HEADER_TAG: [u8; 4] = *b"MThd";
const TRACK_TAG: [u8; 4] = *b"MTrk";
const MIN_HEADER_LENGTH: u32 = 6;
/// `MThd` tag, length and the three 16-bit header fields
const MIN_FILE_LENGTH: usize = 14;
const SMPTE_DIVISION_FLAG: u16 = 0x8000;

const META_EVENT: u8 = 0xFF;
const SYSEX_EVENT: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;

/// Everything read from one file
#[derive(Debug, Clone, Default)]
pub struct ParsedSmf {
    pub header: Option<SmfHeader>,
    pub tracks: Vec<TrackSummary>,
    /// Sorted by tick, stable across tracks
    pub raw_events: Vec<RawTimedEvent>,
    /// Sorted by onset tick, stable across tracks
    pub notes: Vec<PairedNote>,
    pub diagnostics: ImportDiagnostics,
}

/// A decoded track event, as far as this importer cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackEvent {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    /// Meta, sysex and channel messages other than notes
    Ignored,
    /// Data byte with no running status to apply; one byte was discarded
    MissingStatus(u8),
    /// Status byte this importer cannot size; it was discarded
    UnsupportedStatus(u8),
}

/// Parse a Standard MIDI File into paired notes.
///
/// Only note events accepted by `filter` are paired.
pub fn parse_smf(data: &[u8], filter: &FilterConfig) -> Result<ParsedSmf> {
    if data.len() < MIN_FILE_LENGTH {
        return Err(RiffError::InvalidHeader(format!(
            "file is {} bytes, a MIDI header needs at least {}",
            data.len(),
            MIN_FILE_LENGTH
        )));
    }

    let mut cursor = ByteCursor::new(data);
    let header = read_header(&mut cursor)?;
    log::debug!(
        "  Header: format {}, {} tracks, {} ticks per quarter",
        header.format,
        header.track_count,
        header.ticks_per_quarter
    );

    let mut parsed = ParsedSmf {
        header: Some(header),
        ..Default::default()
    };

    for index in 0..header.track_count as usize {
        let id = cursor.read_chunk_id();
        if id != Some(TRACK_TAG) {
            return Err(RiffError::InvalidTrackChunk {
                index,
                found: describe_chunk_id(id),
            });
        }
        let declared_length = cursor.read_u32_be()?;
        // The declared length is authoritative: the next chunk starts right
        // after it no matter where the last event ended.
        let body = cursor.take(declared_length as usize);
        parse_track(index, declared_length, body, filter, &mut parsed);
    }

    // Stable, so equal ticks keep track order
    parsed.raw_events.sort_by_key(|e| e.tick);
    parsed.notes.sort_by_key(|n| n.onset_tick);

    Ok(parsed)
}

fn read_header(cursor: &mut ByteCursor) -> Result<SmfHeader> {
    let id = cursor.read_chunk_id();
    if id != Some(HEADER_TAG) {
        return Err(RiffError::InvalidHeader(format!(
            "expected \"MThd\", found {}",
            describe_chunk_id(id)
        )));
    }

    let length = cursor.read_u32_be()?;
    if length < MIN_HEADER_LENGTH {
        return Err(RiffError::InvalidHeader(format!(
            "header length {} is shorter than {}",
            length, MIN_HEADER_LENGTH
        )));
    }

    let format = cursor.read_u16_be()?;
    let track_count = cursor.read_u16_be()?;
    let division = cursor.read_u16_be()?;
    cursor.skip((length - MIN_HEADER_LENGTH) as usize);

    if division & SMPTE_DIVISION_FLAG != 0 {
        return Err(RiffError::UnsupportedTimeDivision(division));
    }
    let ticks_per_quarter = match division & !SMPTE_DIVISION_FLAG {
        0 => DEFAULT_TICKS_PER_QUARTER,
        tpq => tpq,
    };

    Ok(SmfHeader {
        format,
        track_count,
        ticks_per_quarter,
    })
}

fn parse_track(
    index: usize,
    declared_length: u32,
    mut body: ByteCursor,
    filter: &FilterConfig,
    parsed: &mut ParsedSmf,
) {
    let mut stacks = NoteStacks::new(index);
    let mut tick: u64 = 0;
    let mut running_status: Option<u8> = None;
    let mut channels = [false; 16];
    let mut note_count = 0;
    let mut truncated = false;
    let diagnostics = &mut parsed.diagnostics;

    while !body.is_at_end() {
        let event = match body
            .read_var_length()
            .and_then(|delta| {
                tick += delta as u64;
                read_event(&mut body, &mut running_status)
            }) {
            Ok(event) => event,
            Err(err) => {
                log::debug!("  Track {}: event cut off by chunk end ({})", index, err);
                truncated = true;
                diagnostics.truncated_tracks += 1;
                break;
            }
        };

        match event {
            TrackEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => {
                if !filter.accepts(channel) {
                    diagnostics.filtered_events += 1;
                    continue;
                }
                stacks.note_on(channel, pitch, tick, velocity);
            }
            TrackEvent::NoteOff { channel, pitch } => {
                if !filter.accepts(channel) {
                    diagnostics.filtered_events += 1;
                    continue;
                }
                match stacks.note_off(channel, pitch, tick) {
                    Release::Paired(note) => {
                        parsed.raw_events.push(RawTimedEvent {
                            tick: note.onset_tick,
                            pitch,
                            velocity: note.velocity,
                            channel,
                            is_onset: true,
                        });
                        parsed.raw_events.push(RawTimedEvent {
                            tick,
                            pitch,
                            velocity: 0,
                            channel,
                            is_onset: false,
                        });
                        parsed.notes.push(note);
                        channels[channel as usize] = true;
                        note_count += 1;
                    }
                    Release::Orphan => {
                        log::debug!(
                            "  Track {}: orphan release ch {} pitch {} at tick {}",
                            index,
                            channel,
                            pitch,
                            tick
                        );
                        diagnostics.orphan_releases += 1;
                    }
                }
            }
            TrackEvent::Ignored => {}
            TrackEvent::MissingStatus(byte) => {
                log::debug!(
                    "  Track {}: data byte 0x{:02X} with no running status, skipped",
                    index,
                    byte
                );
                diagnostics.running_status_errors += 1;
            }
            TrackEvent::UnsupportedStatus(status) => {
                log::debug!(
                    "  Track {}: unsupported status 0x{:02X}, skipped",
                    index,
                    status
                );
                diagnostics.unsupported_status_bytes += 1;
            }
        }
    }

    let dangling = stacks.finish();
    if dangling > 0 {
        log::debug!("  Track {}: {} onsets never released", index, dangling);
    }
    diagnostics.dangling_onsets += dangling;

    parsed.tracks.push(TrackSummary {
        index,
        declared_length,
        note_count,
        channels: (0..16u8).filter(|&c| channels[c as usize]).collect(),
        truncated,
    });
}

/// Decode one event after its delta time
fn read_event(body: &mut ByteCursor, running_status: &mut Option<u8>) -> Result<TrackEvent> {
    let status = match body.peek_u8() {
        Some(byte) if byte & 0x80 != 0 => {
            body.skip(1);
            byte
        }
        Some(byte) => match *running_status {
            Some(status) => status,
            None => {
                body.skip(1);
                return Ok(TrackEvent::MissingStatus(byte));
            }
        },
        // Delta time with nothing after it
        None => body.read_u8()?,
    };

    match status {
        META_EVENT => {
            let _meta_type = body.read_u8()?;
            let length = body.read_var_length()?;
            skip_exact(body, length as usize)?;
            Ok(TrackEvent::Ignored)
        }
        SYSEX_EVENT | SYSEX_ESCAPE => {
            let length = body.read_var_length()?;
            skip_exact(body, length as usize)?;
            Ok(TrackEvent::Ignored)
        }
        0x80..=0xEF => {
            *running_status = Some(status);
            let channel = status & 0x0F;
            match status & 0xF0 {
                0x80 => {
                    let pitch = body.read_u8()? & 0x7F;
                    let _velocity = body.read_u8()?;
                    Ok(TrackEvent::NoteOff { channel, pitch })
                }
                0x90 => {
                    let pitch = body.read_u8()? & 0x7F;
                    let velocity = body.read_u8()? & 0x7F;
                    if velocity == 0 {
                        Ok(TrackEvent::NoteOff { channel, pitch })
                    } else {
                        Ok(TrackEvent::NoteOn {
                            channel,
                            pitch,
                            velocity,
                        })
                    }
                }
                // Poly aftertouch, control change, pitch bend
                0xA0 | 0xB0 | 0xE0 => {
                    body.read_u8()?;
                    body.read_u8()?;
                    Ok(TrackEvent::Ignored)
                }
                // Program change, channel pressure
                _ => {
                    body.read_u8()?;
                    Ok(TrackEvent::Ignored)
                }
            }
        }
        other => Ok(TrackEvent::UnsupportedStatus(other)),
    }
}

/// Skip `len` bytes, failing if the body ends first
fn skip_exact(body: &mut ByteCursor, len: usize) -> Result<()> {
    let offset = body.absolute_position();
    let skipped = body.skip(len);
    if skipped < len {
        return Err(RiffError::UnexpectedEndOfData {
            offset,
            needed: len - skipped,
        });
    }
    Ok(())
}

pub fn run(state: &mut ImportState, config: &Config) -> Result<()> {
    log::info!("Pass 0: SMF Structural Parse");

    let parsed = parse_smf(state.data, &config.filter)?;

    log::info!(
        "  {} tracks, {} paired notes, {} raw events",
        parsed.tracks.len(),
        parsed.notes.len(),
        parsed.raw_events.len()
    );

    state.header = parsed.header;
    state.tracks = parsed.tracks;
    state.raw_events = parsed.raw_events;
    state.paired_notes = parsed.notes;
    state.diagnostics = parsed.diagnostics;

    log::info!("  ✓ Pass 0 complete");
    Ok(())
}
