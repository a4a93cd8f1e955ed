//! Tests for Pass 3: Same-Step Dedupe & Final Ordering

use midi2riff::config::Config;
use midi2riff::passes::pass_3::{self, dedupe_same_step_same_pitch};
use midi2riff::{ImportState, QuantizedNote};

fn note(step: u32, pitch: u8, duration_steps: u32, velocity01: f32) -> QuantizedNote {
    QuantizedNote {
        step,
        pitch,
        duration_steps,
        velocity01,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loudest_wins_with_longest_duration() {
        let notes = vec![note(4, 38, 6, 0.4), note(4, 38, 1, 0.9), note(4, 38, 2, 0.6)];
        let (deduped, merged) = dedupe_same_step_same_pitch(notes);
        assert_eq!(merged, 2);
        assert_eq!(deduped, vec![note(4, 38, 6, 0.9)]);
    }

    #[test]
    fn test_equal_velocity_keeps_first() {
        let notes = vec![note(0, 60, 1, 0.5), note(0, 60, 3, 0.5)];
        let (deduped, _) = dedupe_same_step_same_pitch(notes);
        assert_eq!(deduped, vec![note(0, 60, 3, 0.5)]);
    }

    #[test]
    fn test_distinct_keys_untouched_and_sorted() {
        let notes = vec![
            note(8, 36, 1, 1.0),
            note(0, 42, 1, 0.3),
            note(0, 36, 2, 1.0),
            note(8, 42, 1, 0.3),
        ];
        let (deduped, merged) = dedupe_same_step_same_pitch(notes);
        assert_eq!(merged, 0);
        let order: Vec<(u32, u8)> = deduped.iter().map(|n| (n.step, n.pitch)).collect();
        assert_eq!(order, vec![(0, 36), (0, 42), (8, 36), (8, 42)]);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let notes = vec![
            note(3, 50, 2, 0.2),
            note(3, 50, 5, 0.7),
            note(1, 50, 1, 0.1),
            note(3, 51, 1, 0.9),
            note(1, 50, 4, 0.1),
        ];
        let (once, _) = dedupe_same_step_same_pitch(notes);
        let (twice, merged_again) = dedupe_same_step_same_pitch(once.clone());
        assert_eq!(once, twice);
        assert_eq!(merged_again, 0);
    }

    #[test]
    fn test_run_with_dedupe_disabled_keeps_collisions_in_order() {
        let data = [0u8; 0];
        let mut state = ImportState::new(&data);
        state.quantized = vec![
            note(2, 60, 1, 0.3),
            note(0, 61, 1, 0.3),
            note(2, 60, 2, 0.9),
        ];

        let mut config = Config::default();
        config.resolve.dedupe_same_step_same_pitch = false;
        pass_3::run(&mut state, &config).unwrap();
        assert_eq!(
            state.quantized,
            vec![note(0, 61, 1, 0.3), note(2, 60, 1, 0.3), note(2, 60, 2, 0.9)]
        );
        assert_eq!(state.diagnostics.merged_duplicates, 0);

        config.resolve.dedupe_same_step_same_pitch = true;
        pass_3::run(&mut state, &config).unwrap();
        assert_eq!(
            state.quantized,
            vec![note(0, 61, 1, 0.3), note(2, 60, 2, 0.9)]
        );
        assert_eq!(state.diagnostics.merged_duplicates, 1);
    }
}
