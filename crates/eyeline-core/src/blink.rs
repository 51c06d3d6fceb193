//! Blink counting over the per-frame eye-closure signal.
//!
//! The detector is a small state machine:
//!
//! `Open → Closing → BlinkCounted → Open`
//!
//! Both eyes must read closed for `window_frames` consecutive updates. When the
//! window fills and the cooldown has run out a blink is counted and the
//! cooldown restarts; otherwise the closure is suppressed. Either way the
//! machine returns to `Open`. The cooldown ticks once per update, so no two
//! counted blinks are ever closer than `cooldown_frames` updates.
//!
//! Frames without a usable face are not fed to the detector at all, so they
//! neither advance nor break a closure run.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::features::EyeGeometry;

/// Which per-eye measurement is compared against the closure threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkSignal {
    /// Normalized distance between the mid upper and lower lid landmarks.
    #[default]
    LidGap,
    /// Eye aspect ratio.
    AspectRatio,
}

impl BlinkSignal {
    pub fn read(self, eye: &EyeGeometry) -> f32 {
        match self {
            BlinkSignal::LidGap => eye.lid_gap,
            BlinkSignal::AspectRatio => eye.aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkPhase {
    #[default]
    Open,
    Closing,
    BlinkCounted,
}

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    signal: BlinkSignal,
    closure_threshold: f32,
    window_frames: usize,
    cooldown_frames: u32,

    phase: BlinkPhase,
    consecutive_closed_frames: usize,
    cooldown_remaining: u32,
    blink_count: u32,
    suppressed_count: u32,
}

impl BlinkDetector {
    pub fn new(
        signal: BlinkSignal,
        closure_threshold: f32,
        window_frames: usize,
        cooldown_frames: u32,
    ) -> Self {
        Self {
            signal,
            closure_threshold,
            window_frames: window_frames.max(1),
            cooldown_frames,
            phase: BlinkPhase::Open,
            consecutive_closed_frames: 0,
            cooldown_remaining: 0,
            blink_count: 0,
            suppressed_count: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.blink_signal,
            config.blink_closure_threshold,
            config.blink_window_frames,
            config.blink_cooldown_frames,
        )
    }

    /// Both eyes below the closure threshold.
    pub fn is_closed(&self, left: &EyeGeometry, right: &EyeGeometry) -> bool {
        self.signal.read(left) < self.closure_threshold
            && self.signal.read(right) < self.closure_threshold
    }

    /// Feed one frame's eye geometry. Returns true when a blink is counted.
    pub fn observe(&mut self, left: &EyeGeometry, right: &EyeGeometry) -> bool {
        let closed = self.is_closed(left, right);
        self.update(closed)
    }

    /// Advance the state machine by one update. Returns true when a blink is counted.
    pub fn update(&mut self, closed: bool) -> bool {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);

        if !closed {
            self.consecutive_closed_frames = 0;
            self.phase = BlinkPhase::Open;
            return false;
        }

        self.consecutive_closed_frames += 1;
        if self.consecutive_closed_frames < self.window_frames {
            self.phase = BlinkPhase::Closing;
            return false;
        }

        self.consecutive_closed_frames = 0;
        if self.cooldown_remaining == 0 {
            self.blink_count += 1;
            self.cooldown_remaining = self.cooldown_frames;
            self.phase = BlinkPhase::BlinkCounted;
            tracing::debug!(blink_count = self.blink_count, "blink counted");
            true
        } else {
            self.suppressed_count += 1;
            self.phase = BlinkPhase::Open;
            tracing::trace!(
                cooldown_remaining = self.cooldown_remaining,
                "blink suppressed by cooldown"
            );
            false
        }
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    /// Closures that filled the window while the cooldown was still running.
    pub fn suppressed_count(&self) -> u32 {
        self.suppressed_count
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn consecutive_closed_frames(&self) -> usize {
        self.consecutive_closed_frames
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn reset(&mut self) {
        self.phase = BlinkPhase::Open;
        self.consecutive_closed_frames = 0;
        self.cooldown_remaining = 0;
        self.blink_count = 0;
        self.suppressed_count = 0;
    }
}
