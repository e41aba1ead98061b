//! Attendance evaluation.
//!
//! Turns one student's join/leave history into a verdict for a class window.
//! Everything here is pure: the caller supplies the history, the window and
//! the instant that still-open events are considered to end at.

use chrono::{DateTime, Duration, Utc};

use super::verdict::{AttendanceStatus, AttendanceVerdict};
use super::window::ClassWindow;
use crate::models::AttendanceEvent;

/// How an event's time is counted toward the class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationMode {
    /// Only the part of each event inside the window counts
    Clipped,
    /// The whole stay counts, including time outside the window
    Unclipped,
}

impl DurationMode {
    pub fn from_clip_flag(clip_to_window: bool) -> Self {
        if clip_to_window {
            DurationMode::Clipped
        } else {
            DurationMode::Unclipped
        }
    }
}

/// Does the event overlap the window at all?
pub fn overlaps(event: &AttendanceEvent, window: &ClassWindow) -> bool {
    event.join_time < window.end && event.leave_time.map_or(true, |leave| leave > window.start)
}

/// Counted time of one event; open events end at `now`
pub fn attended(
    event: &AttendanceEvent,
    window: &ClassWindow,
    now: DateTime<Utc>,
    mode: DurationMode,
) -> Duration {
    let leave = event.leave_time.unwrap_or(now);
    let counted = match mode {
        DurationMode::Clipped => leave.min(window.end) - event.join_time.max(window.start),
        DurationMode::Unclipped => leave - event.join_time,
    };
    counted.max(Duration::zero())
}

/// Integer percentage of `class_duration`, rounded down and capped at 100
pub fn percentage(total: Duration, class_duration: Duration) -> u8 {
    if total <= Duration::zero() {
        return 0;
    }
    let class_ms = class_duration.num_milliseconds();
    if class_ms <= 0 {
        return 100;
    }
    let pct = total.num_milliseconds().saturating_mul(100) / class_ms;
    pct.clamp(0, 100) as u8
}

/// Evaluate one student's history against a class window
pub fn evaluate(
    history: &[AttendanceEvent],
    window: &ClassWindow,
    now: DateTime<Utc>,
    mode: DurationMode,
) -> AttendanceVerdict {
    let mut total = Duration::zero();
    let mut earliest_join: Option<DateTime<Utc>> = None;

    for event in history.iter().filter(|e| overlaps(e, window)) {
        total = total + attended(event, window, now, mode);
        earliest_join = Some(match earliest_join {
            Some(current) => current.min(event.join_time),
            None => event.join_time,
        });
    }

    let earliest_join = match earliest_join {
        Some(join) if total > Duration::zero() => join,
        _ => return AttendanceVerdict::absent(),
    };

    let percentage = percentage(total, window.class_duration);
    let status = if earliest_join > window.grace_boundary() {
        AttendanceStatus::Late {
            late_by: earliest_join - window.nominal_start(),
        }
    } else {
        AttendanceStatus::Present
    };

    AttendanceVerdict { status, percentage }
}
