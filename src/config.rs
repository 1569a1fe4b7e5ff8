//! System configuration parameters
//!
//! All tunable parameters for the recycling bin.  Values can be overridden
//! from a JSON file through the [`ConfigPort`](crate::app::ports::ConfigPort).
//! Every field has a default, so a partial file is valid.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sensors::BeamId;

/// Options handed to the external image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Model file loaded by the classifier binding.
    pub model_path: String,
    /// Keep at most this many categories per frame.
    pub max_results: usize,
    /// Drop categories scoring below this.
    pub score_threshold: f32,
    /// Inference threads.
    pub num_threads: u8,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            model_path: "models/default_model.tflite".into(),
            max_results: 3,
            score_threshold: 0.20,
            num_threads: 4,
        }
    }
}

/// Servo set-points on the normalised [-1.0, 1.0] scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoPositions {
    pub selector_center: f32,
    pub selector_recycle: f32,
    pub selector_reject: f32,
    pub lock_engaged: f32,
    pub lock_released: f32,
}

impl Default for ServoPositions {
    fn default() -> Self {
        Self {
            selector_center: 0.0,
            selector_recycle: -1.0,
            selector_reject: 1.0,
            lock_engaged: 1.0,
            lock_released: -1.0,
        }
    }
}

/// Core bin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
    // --- Decision ---
    /// Best-guess score must be strictly above this to unlock the recycle side.
    pub unlock_threshold: f32,
    pub classifier: ClassifierOptions,
    /// Mirror frames horizontally before classification.
    pub mirror_frames: bool,

    // --- Sensors ---
    pub motion_debounce_ms: u64,
    pub beam_debounce_ms: u64,
    /// Delay before an occluded beam is treated as a jam.
    pub beam_confirm_delay_ms: u64,
    /// Backoff before a watchdog check or a sort retries a busy sequencer.
    pub watchdog_retry_backoff_ms: u64,

    // --- Cycle timing ---
    /// Wait after a trigger before taking the frame (hand withdraws).
    pub capture_grace_ms: u64,
    /// Upper bound on waiting for a frame.
    pub frame_wait_budget_ms: u64,
    pub servo_settle_ms: u64,
    pub lock_settle_ms: u64,
    /// How long the green result stays lit after a recycle.
    pub recycle_display_ms: u64,
    /// How long the red result stays lit after a reject.
    pub reject_display_ms: u64,
    pub cooldown_ms: u64,
    /// Control thread poll interval.
    pub poll_interval_ms: u64,

    // --- Challenge ---
    pub challenge_window_ms: u64,

    // --- Persistence ---
    pub save_images: bool,
    pub classified_dir: String,
    pub challenged_dir: String,

    // --- Wiring ---
    /// Beam checked mid-sequence; occluded means lock the door.
    pub lock_check_beam: BeamId,
    /// Beam an item crosses on its way into the recycle side.
    pub recycle_route_beam: Option<BeamId>,
    /// Beam an item crosses on its way into the reject side.
    pub reject_route_beam: Option<BeamId>,
    pub servo: ServoPositions,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            // Decision
            unlock_threshold: 0.6,
            classifier: ClassifierOptions::default(),
            mirror_frames: true,

            // Sensors
            motion_debounce_ms: 8_000,
            beam_debounce_ms: 0,
            beam_confirm_delay_ms: 10_000,
            watchdog_retry_backoff_ms: 500,

            // Cycle timing
            capture_grace_ms: 1_000,
            frame_wait_budget_ms: 2_000,
            servo_settle_ms: 2_000,
            lock_settle_ms: 2_000,
            recycle_display_ms: 4_000,
            reject_display_ms: 2_000,
            cooldown_ms: 500,
            poll_interval_ms: 50, // 20 Hz

            // Challenge
            challenge_window_ms: 10_000,

            // Persistence
            save_images: false,
            classified_dir: "classified_images".into(),
            challenged_dir: "challenged_images".into(),

            // Wiring
            lock_check_beam: BeamId::Beam2,
            recycle_route_beam: Some(BeamId::Beam1),
            reject_route_beam: Some(BeamId::Beam3),
            servo: ServoPositions::default(),
        }
    }
}

impl BinConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.unlock_threshold) {
            return Err(ConfigError::ValidationFailed("unlock_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.classifier.score_threshold) {
            return Err(ConfigError::ValidationFailed(
                "classifier.score_threshold must be in [0, 1]",
            ));
        }
        if self.classifier.max_results == 0 {
            return Err(ConfigError::ValidationFailed("classifier.max_results must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if self.beam_confirm_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("beam_confirm_delay_ms must be > 0"));
        }
        if self.frame_wait_budget_ms == 0 {
            return Err(ConfigError::ValidationFailed("frame_wait_budget_ms must be > 0"));
        }
        let s = &self.servo;
        let positions = [
            s.selector_center,
            s.selector_recycle,
            s.selector_reject,
            s.lock_engaged,
            s.lock_released,
        ];
        if positions.iter().any(|p| !(-1.0..=1.0).contains(p)) {
            return Err(ConfigError::ValidationFailed("servo positions must be in [-1, 1]"));
        }
        Ok(())
    }
}
