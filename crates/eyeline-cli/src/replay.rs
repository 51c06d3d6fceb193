//! `eyeline replay`: run recorded landmark frames through an engine offline.

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use eyeline_core::{CaptureClock, EyeContactEngine, LandmarkFrame, Point, SessionSummary};
use serde::Deserialize;

/// One line of a recording: a capture timestamp and the detector output.
#[derive(Debug, Deserialize)]
pub struct RecordedFrame {
    /// Capture time in milliseconds on any monotonic clock.
    pub t_ms: u64,
    /// `null` or an empty array when no face was detected.
    #[serde(default)]
    pub landmarks: Option<Vec<[f32; 2]>>,
}

impl RecordedFrame {
    fn frame(self) -> Option<LandmarkFrame> {
        self.landmarks
            .filter(|points| !points.is_empty())
            .map(|points| LandmarkFrame::new(points.into_iter().map(Point::from).collect()))
    }
}

/// Replay a JSONL recording through `engine`.
///
/// Writes one JSON frame result per input line unless `summary_only` is set,
/// in which case only the final session summary is written.
pub fn replay<R: BufRead, W: Write>(
    engine: &mut EyeContactEngine,
    input: R,
    out: &mut W,
    summary_only: bool,
) -> Result<SessionSummary> {
    let mut clock = CaptureClock::new(Instant::now());

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("invalid frame record on line {line_no}"))?;

        if clock.is_behind(record.t_ms) {
            tracing::warn!(
                line = line_no,
                t_ms = record.t_ms,
                previous = ?clock.latest_ms(),
                "timestamp went backwards; holding previous time"
            );
        }
        let at = clock.at(record.t_ms);
        let result = engine.process_at(record.frame().as_ref(), at);
        if !summary_only {
            serde_json::to_writer(&mut *out, &result)?;
            writeln!(out)?;
        }
    }

    let summary = engine.summary();
    if summary_only {
        serde_json::to_writer(&mut *out, &summary)?;
        writeln!(out)?;
    }
    tracing::info!(
        frames = summary.frames,
        face_frames = summary.face_frames,
        contact_ratio = summary.contact_ratio,
        longest_streak_secs = summary.longest_streak_secs,
        blinks = summary.blink_count,
        "replay complete"
    );
    Ok(summary)
}
