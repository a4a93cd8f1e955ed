//! MIDI-to-Riff Import
//!
//! Converts a Standard MIDI File into a one-bar step sequencer pattern:
//! binary SMF parsing, LIFO note pairing, step quantization and collision
//! resolution, run as a fixed sequence of passes over an [`ImportState`].

pub mod config;
pub mod cursor;
pub mod error;
pub mod midi;
pub mod pairing;
pub mod passes;
pub mod pattern;
pub mod report;
pub mod state;

pub use config::{validate_config, BoundaryPolicy, Config};
pub use error::{Result as RiffResult, RiffError};
pub use pattern::{OverlapPolicy, Pattern, QuantizedNote};
pub use report::{export_report, ImportReport};
pub use state::{ImportDiagnostics, ImportState};

use std::path::Path;

/// Main import pipeline
pub struct MidiToRiff {
    config: Config,
}

impl MidiToRiff {
    /// Create an importer with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Import raw SMF bytes into a pattern
    pub fn import(&self, data: &[u8]) -> RiffResult<Pattern> {
        self.import_with_report(data).map(|report| report.pattern)
    }

    /// Import raw SMF bytes, keeping the header, track summaries and diagnostics
    pub fn import_with_report(&self, data: &[u8]) -> RiffResult<ImportReport> {
        // Caller preconditions are checked before any bytes are read
        validate_config(&self.config)?;

        let mut state = ImportState::new(data);
        self.run_pipeline(&mut state)?;
        state.diagnostics.log_summary();

        let pattern = self.build_pattern(&mut state);
        let header = state.header.ok_or_else(|| {
            RiffError::InvalidHeader("pipeline finished without a header".to_string())
        })?;

        Ok(ImportReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            header,
            tracks: state.tracks,
            diagnostics: state.diagnostics,
            pattern,
        })
    }

    /// Read and import a `.mid` file
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> RiffResult<ImportReport> {
        let data = std::fs::read(path.as_ref())?;
        log::info!("Importing {} ({} bytes)", path.as_ref().display(), data.len());
        self.import_with_report(&data)
    }

    /// Parse only, without quantizing. Used for inspection.
    pub fn inspect<'a>(&self, data: &'a [u8]) -> RiffResult<ImportState<'a>> {
        validate_config(&self.config)?;
        let mut state = ImportState::new(data);
        passes::pass_0::run(&mut state, &self.config)?;
        Ok(state)
    }

    /// Execute the complete multi-pass pipeline
    fn run_pipeline(&self, state: &mut ImportState) -> RiffResult<()> {
        // Pass 0: SMF Structural Parse + note pairing
        passes::pass_0::run(state, &self.config)?;

        // Pass 1: Step Quantization
        passes::pass_1::run(state, &self.config)?;

        // Pass 2: Duration Clamp to Next Onset
        passes::pass_2::run(state, &self.config)?;

        // Pass 3: Same-Step Dedupe & Final Ordering
        passes::pass_3::run(state, &self.config)?;

        Ok(())
    }

    fn build_pattern(&self, state: &mut ImportState) -> Pattern {
        let overlap_policy = if self.config.resolve.clamp_duration_to_next_onset {
            OverlapPolicy::ClampToNextOnset
        } else {
            OverlapPolicy::AllowOverlap
        };

        Pattern {
            id: self.config.pattern.pattern_id.clone(),
            root_pitch: self.config.pattern.root_pitch,
            steps_per_loop: self.config.grid.steps_per_bar,
            events: std::mem::take(&mut state.quantized),
            overlap_policy,
        }
    }
}

impl Default for MidiToRiff {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
