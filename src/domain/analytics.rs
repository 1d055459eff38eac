//! Bounce classification and engagement rollups.

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::error::DomainError;

/// A visit shorter than this many seconds may count as a bounce.
pub const BOUNCE_TIME_THRESHOLD_SECS: i32 = 15;
/// A visit that scrolled less than this percentage may count as a bounce.
pub const BOUNCE_SCROLL_THRESHOLD_PCT: i16 = 25;
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Both thresholds must be missed for a view to bounce.
pub fn classify_bounce(time_spent: i32, scroll_depth: i16) -> bool {
    time_spent < BOUNCE_TIME_THRESHOLD_SECS && scroll_depth < BOUNCE_SCROLL_THRESHOLD_PCT
}

pub fn clamp_scroll_depth(raw: i32) -> i16 {
    // Lossless: the clamped value fits in 0..=100.
    raw.clamp(0, 100) as i16
}

/// Client-reported durations in seconds. Negative values are rejected;
/// oversized ones saturate.
pub fn checked_duration_secs(raw: i64, field: &str) -> Result<i32, DomainError> {
    if raw < 0 {
        return Err(DomainError::validation(format!("{field} must not be negative")));
    }
    Ok(raw.min(i64::from(i32::MAX)) as i32)
}

/// Start of a trailing window of `window_days` days ending at `now`.
pub fn window_start(now: OffsetDateTime, window_days: u32) -> Result<OffsetDateTime, DomainError> {
    if window_days == 0 || window_days > MAX_WINDOW_DAYS {
        return Err(DomainError::validation(format!(
            "window must be between 1 and {MAX_WINDOW_DAYS} days"
        )));
    }
    Ok(now - Duration::days(i64::from(window_days)))
}

/// Raw sums over the view records of one content item in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewTotals {
    pub total_views: u64,
    pub unique_visitors: u64,
    pub total_time_spent: i64,
    pub total_scroll_depth: i64,
    pub bounced_views: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub total_views: u64,
    pub unique_visitors: u64,
    pub avg_time_spent: f64,
    pub avg_scroll_depth: f64,
    /// Fraction of bounced views, `0.0` when there are no views.
    pub bounce_rate: f64,
}

impl EngagementSummary {
    pub fn from_totals(totals: ViewTotals) -> Self {
        if totals.total_views == 0 {
            return Self {
                total_views: 0,
                unique_visitors: 0,
                avg_time_spent: 0.0,
                avg_scroll_depth: 0.0,
                bounce_rate: 0.0,
            };
        }
        let views = totals.total_views as f64;
        Self {
            total_views: totals.total_views,
            unique_visitors: totals.unique_visitors,
            avg_time_spent: totals.total_time_spent as f64 / views,
            avg_scroll_depth: totals.total_scroll_depth as f64 / views,
            bounce_rate: totals.bounced_views as f64 / views,
        }
    }
}
