//! Preview rendering of a pattern back to a Standard MIDI File

use crate::config::GridConfig;
use crate::error::{Result, RiffError};
use crate::pattern::Pattern;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use std::path::{Path, PathBuf};

/// Preview tempo, 120 BPM
const PREVIEW_TEMPO_USPQ: u32 = 500_000;

/// Write a format-0 preview of `pattern` into `output_dir` as `<id>.mid`
pub fn export_midi(
    pattern: &Pattern,
    grid: &GridConfig,
    ticks_per_quarter: u16,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let midi_path = output_dir.join(format!("{}.mid", file_stem(&pattern.id)));
    let midi_data = render_pattern(pattern, grid, ticks_per_quarter)?;
    std::fs::write(&midi_path, midi_data)?;

    log::info!(
        "Exported {} pattern events to {}",
        pattern.events.len(),
        midi_path.display()
    );
    Ok(midi_path)
}

/// Render `pattern` as a single-track SMF on channel 0, one bar long
pub fn render_pattern(pattern: &Pattern, grid: &GridConfig, ticks_per_quarter: u16) -> Result<Vec<u8>> {
    let ticks_per_step = ticks_per_quarter as f64 / grid.steps_per_beat().max(1) as f64;
    let step_tick = |step: u32| (step as f64 * ticks_per_step).round() as u32;

    // (absolute tick, is_note_on, key, velocity); releases sort before onsets on the same tick
    let mut timeline: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(pattern.events.len() * 2);
    for event in &pattern.events {
        let velocity = (event.velocity01 * 127.0).round().clamp(1.0, 127.0) as u8;
        timeline.push((step_tick(event.step), true, event.pitch, velocity));
        timeline.push((step_tick(event.end_step()), false, event.pitch, 0));
    }
    timeline.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut track_events = vec![
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(pattern.id.as_bytes())),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(PREVIEW_TEMPO_USPQ))),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                grid.beats_per_bar.min(255) as u8,
                2,  // quarter-note beat
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per quarter note
            )),
        },
    ];

    let mut current_tick = 0u32;
    for (tick, is_on, key, velocity) in timeline {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::from(key),
                vel: u7::from(0),
            }
        };
        track_events.push(TrackEvent {
            delta: u28::from(tick - current_tick),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message,
            },
        });
        current_tick = tick;
    }

    // Hold the file open to the end of the bar
    let bar_end = step_tick(pattern.steps_per_loop);
    track_events.push(TrackEvent {
        delta: u28::from(bar_end.saturating_sub(current_tick)),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: midly::Timing::Metrical(u15::from(ticks_per_quarter)),
        },
        tracks: vec![track_events],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| RiffError::MidiExport(format!("Failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}

/// File-system safe name for a pattern id
pub(crate) fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::passes::pass_0::parse_smf;
    use crate::pattern::{OverlapPolicy, QuantizedNote};

    fn pattern() -> Pattern {
        Pattern {
            id: "preview".to_string(),
            root_pitch: 60,
            steps_per_loop: 16,
            events: vec![
                QuantizedNote {
                    step: 0,
                    pitch: 36,
                    duration_steps: 4,
                    velocity01: 1.0,
                },
                QuantizedNote {
                    step: 4,
                    pitch: 36,
                    duration_steps: 2,
                    velocity01: 0.5,
                },
                QuantizedNote {
                    step: 4,
                    pitch: 42,
                    duration_steps: 1,
                    velocity01: 0.0,
                },
            ],
            overlap_policy: OverlapPolicy::ClampToNextOnset,
        }
    }

    #[test]
    fn test_rendered_file_reads_back_at_step_positions() {
        let grid = GridConfig::default();
        let bytes = render_pattern(&pattern(), &grid, 96).unwrap();

        let parsed = parse_smf(&bytes, &FilterConfig::default()).unwrap();
        assert_eq!(parsed.header.unwrap().ticks_per_quarter, 96);
        assert!(parsed.diagnostics.is_clean());

        // 24 ticks per step at 96 PPQ and 4 steps per beat. Equal onsets
        // keep release order.
        let notes: Vec<(u64, u64, u8, u8)> = parsed
            .notes
            .iter()
            .map(|n| (n.onset_tick, n.duration_ticks, n.pitch, n.velocity))
            .collect();
        assert_eq!(
            notes,
            vec![(0, 96, 36, 127), (96, 24, 42, 1), (96, 48, 36, 64)]
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("bass/line 1"), "bass_line_1");
        assert_eq!(file_stem("lead-2_b"), "lead-2_b");
    }
}
