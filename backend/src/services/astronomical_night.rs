//! Sunset, sunrise and twilight computation.
//!
//! Threshold crossings and dark periods come from siderust's solar altitude
//! search. The night labelled with a date runs from local noon of that date
//! to local noon of the next day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};
use siderust::bodies::Sun;
use siderust::event::altitude::{below_threshold, crossings, CrossingDirection, SearchOpts};
use siderust::event::solar::night_types::twilight;
use siderust::time::Interval;

use crate::models::{merge_periods, ObservingSite, Period, TimeAxis};

/// Solar altitude thresholds that bound the night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwilightLevel {
    /// Upper limb on the horizon, refraction included (−0.833°).
    Horizon,
    Civil,
    Nautical,
    Astronomical,
}

impl TwilightLevel {
    pub const ALL: [TwilightLevel; 4] = [
        TwilightLevel::Horizon,
        TwilightLevel::Civil,
        TwilightLevel::Nautical,
        TwilightLevel::Astronomical,
    ];

    fn threshold(self) -> siderust::qtty::Degrees {
        match self {
            TwilightLevel::Horizon => twilight::APPARENT_HORIZON,
            TwilightLevel::Civil => twilight::CIVIL,
            TwilightLevel::Nautical => twilight::NAUTICAL,
            TwilightLevel::Astronomical => twilight::ASTRONOMICAL,
        }
    }

    pub fn altitude(self) -> Degrees {
        Degrees::new(self.threshold().value())
    }
}

/// Solar crossings of one threshold inside a UTC window, oldest first.
fn solar_crossings(
    site: &ObservingSite,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    level: TwilightLevel,
) -> Vec<(DateTime<Utc>, CrossingDirection)> {
    let axis = TimeAxis::new(start);
    let window = Interval::new(axis.mjd(start), axis.mjd(stop));
    crossings(&Sun, &site.geodetic(), window, level.threshold(), SearchOpts::default())
        .into_iter()
        .map(|event| (axis.instant(event.mjd), event.direction))
        .collect()
}

/// Evening and morning crossings of every twilight level for one night.
///
/// Missing values mean the Sun never crosses that level during the night
/// (polar day or night, or summer nights that never get fully dark).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwilightTimes {
    pub date: NaiveDate,
    pub sunset: Option<DateTime<Utc>>,
    pub civil_dusk: Option<DateTime<Utc>>,
    pub nautical_dusk: Option<DateTime<Utc>>,
    pub astronomical_dusk: Option<DateTime<Utc>>,
    pub astronomical_dawn: Option<DateTime<Utc>>,
    pub nautical_dawn: Option<DateTime<Utc>>,
    pub civil_dawn: Option<DateTime<Utc>>,
    pub sunrise: Option<DateTime<Utc>>,
}

impl TwilightTimes {
    pub fn evening(&self, level: TwilightLevel) -> Option<DateTime<Utc>> {
        match level {
            TwilightLevel::Horizon => self.sunset,
            TwilightLevel::Civil => self.civil_dusk,
            TwilightLevel::Nautical => self.nautical_dusk,
            TwilightLevel::Astronomical => self.astronomical_dusk,
        }
    }

    pub fn morning(&self, level: TwilightLevel) -> Option<DateTime<Utc>> {
        match level {
            TwilightLevel::Horizon => self.sunrise,
            TwilightLevel::Civil => self.civil_dawn,
            TwilightLevel::Nautical => self.nautical_dawn,
            TwilightLevel::Astronomical => self.astronomical_dawn,
        }
    }

    /// Interval between the evening and morning crossing of `level`.
    pub fn night(&self, level: TwilightLevel) -> Option<Period> {
        Period::new(self.evening(level)?, self.morning(level)?)
    }

    pub fn astronomical_night(&self) -> Option<Period> {
        self.night(TwilightLevel::Astronomical)
    }
}

/// Sunset, sunrise and twilight times for the night starting on `date`.
pub fn twilight_times(site: &ObservingSite, date: NaiveDate) -> TwilightTimes {
    let start = site.local_noon(date);
    let stop = start + Duration::hours(24);

    let events: Vec<_> = TwilightLevel::ALL
        .iter()
        .map(|level| solar_crossings(site, start, stop, *level))
        .collect();
    let evening = |level: TwilightLevel| {
        events[level as usize]
            .iter()
            .find(|(_, direction)| *direction == CrossingDirection::Setting)
            .map(|(t, _)| *t)
    };
    let morning = |level: TwilightLevel| {
        events[level as usize]
            .iter()
            .rev()
            .find(|(_, direction)| *direction == CrossingDirection::Rising)
            .map(|(t, _)| *t)
    };

    let times = TwilightTimes {
        date,
        sunset: evening(TwilightLevel::Horizon),
        civil_dusk: evening(TwilightLevel::Civil),
        nautical_dusk: evening(TwilightLevel::Nautical),
        astronomical_dusk: evening(TwilightLevel::Astronomical),
        astronomical_dawn: morning(TwilightLevel::Astronomical),
        nautical_dawn: morning(TwilightLevel::Nautical),
        civil_dawn: morning(TwilightLevel::Civil),
        sunrise: morning(TwilightLevel::Horizon),
    };

    log::debug!(
        "Twilight at {} on {}: sunset {:?}, sunrise {:?}",
        site.name(),
        date,
        times.sunset,
        times.sunrise
    );
    times
}

/// Periods with the Sun more than 18° below the horizon within `time_period`.
pub fn compute_astronomical_nights(site: &ObservingSite, time_period: &Period) -> Vec<Period> {
    compute_dark_periods(site, time_period, TwilightLevel::Astronomical)
}

/// Periods with the Sun below `level` within `time_period`.
pub fn compute_dark_periods(
    site: &ObservingSite,
    time_period: &Period,
    level: TwilightLevel,
) -> Vec<Period> {
    let axis = TimeAxis::new(time_period.start);
    let window = Interval::new(axis.mjd(time_period.start), axis.mjd(time_period.stop));
    let periods = below_threshold(&Sun, &site.geodetic(), window, level.threshold(), SearchOpts::default())
        .into_iter()
        .filter_map(|p| {
            // millisecond rounding can push an edge past the window
            Period::new(
                axis.instant(p.start).max(time_period.start),
                axis.instant(p.end).min(time_period.stop),
            )
        })
        .collect();
    merge_periods(periods)
}
