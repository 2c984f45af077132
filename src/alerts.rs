//! Overdue and upcoming classification of scheduled transactions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Default look-ahead for the upcoming bucket
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Unpaid scheduled items split relative to an instant. The two lists never
/// share an item and both are in ascending scheduled-date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAlerts {
    /// Scheduled strictly before now
    pub overdue: Vec<ScheduledTransaction>,
    /// Scheduled between now and now + window, both inclusive
    pub upcoming: Vec<ScheduledTransaction>,
}

impl ScheduleAlerts {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }

    /// Total number of items that need attention
    pub fn len(&self) -> usize {
        self.overdue.len() + self.upcoming.len()
    }
}

/// Classify with the default seven day window
pub fn compute_alerts(items: &[ScheduledTransaction], now: DateTime<Utc>) -> ScheduleAlerts {
    compute_alerts_within(items, now, Duration::days(UPCOMING_WINDOW_DAYS))
}

/// Classify with a custom look-ahead window
pub fn compute_alerts_within(
    items: &[ScheduledTransaction],
    now: DateTime<Utc>,
    window: Duration,
) -> ScheduleAlerts {
    let horizon = now + window;
    let mut alerts = ScheduleAlerts::default();

    for item in items.iter().filter(|i| !i.is_paid()) {
        if item.scheduled_date < now {
            alerts.overdue.push(item.clone());
        } else if item.scheduled_date <= horizon {
            alerts.upcoming.push(item.clone());
        }
    }

    alerts.overdue.sort_by_key(|i| i.scheduled_date);
    alerts.upcoming.sort_by_key(|i| i.scheduled_date);
    alerts
}
