use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use siderust::time::ModifiedJulianDate as SiderustMJD;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Maps UTC instants onto siderust's day axis and back.
///
/// The axis is pinned at an anchor instant; other instants are placed by
/// their offset from it, so a whole night shares one UTC/TT difference.
#[derive(Debug, Clone, Copy)]
pub struct TimeAxis {
    anchor: DateTime<Utc>,
    anchor_days: f64,
}

impl TimeAxis {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            anchor_days: SiderustMJD::from_chrono(anchor).raw().value(),
        }
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// MJD (days) of `t` on this axis.
    pub fn days(&self, t: DateTime<Utc>) -> f64 {
        self.anchor_days + (t - self.anchor).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    pub fn mjd(&self, t: DateTime<Utc>) -> SiderustMJD {
        SiderustMJD::new(self.days(t))
    }

    /// Nearest UTC instant to `mjd`, to the millisecond.
    pub fn instant(&self, mjd: SiderustMJD) -> DateTime<Utc> {
        let offset = (mjd.raw().value() - self.anchor_days) * MILLIS_PER_DAY;
        self.anchor + Duration::milliseconds(offset.round() as i64)
    }
}

/// Time period with start and stop instants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl Period {
    /// Returns `None` unless `start < stop`.
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Option<Self> {
        if start < stop {
            Some(Self { start, stop })
        } else {
            None
        }
    }

    pub fn duration_hours(&self) -> f64 {
        (self.stop - self.start).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.stop
    }
}

/// Merge overlapping or touching periods into a sorted, disjoint list.
pub fn merge_periods(mut periods: Vec<Period>) -> Vec<Period> {
    periods.sort_by_key(|p| p.start);

    let mut merged: Vec<Period> = Vec::new();
    for period in periods {
        if let Some(last) = merged.last_mut() {
            if period.start <= last.stop {
                if period.stop > last.stop {
                    last.stop = period.stop;
                }
            } else {
                merged.push(period);
            }
        } else {
            merged.push(period);
        }
    }

    merged
}
