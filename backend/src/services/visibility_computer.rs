//! Visibility time series for one target, one site and one night.
//!
//! A [`NightContext`] holds everything that depends only on the site and the
//! night (sample times, Sun and Moon positions, twilight). Target series are
//! then cheap to derive from it, so a plan evaluating many targets on the same
//! night computes the shared part once.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};
use siderust::bodies::{Moon, Sun};
use siderust::coordinates::centers::Geodetic;
use siderust::coordinates::frames::ECEF;
use siderust::coordinates::spherical::direction::ICRS;
use siderust::ephemeris::Vsop87Ephemeris;
use siderust::event::altitude::AltitudeProvider;
use siderust::event::azimuth::AzimuthProvider;
use siderust::event::lunar::phase::moon_phase_geocentric;
use siderust::time::{JulianDate, ModifiedJulianDate as SiderustMJD};

use crate::config::VisibilitySettings;
use crate::error::{PlannerError, PlannerResult};
use crate::models::{merge_periods, Coordinate, ObservingSite, Period, TimeAxis};
use crate::services::astronomical_night::{twilight_times, TwilightLevel, TwilightTimes};

/// Airmass of a sample; undefined at or below the horizon.
///
/// Serialised as a number, or `null` below the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Airmass {
    Defined(f64),
    BelowHorizon,
}

impl Airmass {
    /// sec(z) = 1 / sin(altitude).
    pub fn from_altitude(altitude: Degrees) -> Self {
        if altitude.value() > 0.0 {
            Airmass::Defined(1.0 / altitude.sin())
        } else {
            Airmass::BelowHorizon
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Airmass::Defined(v) => Some(*v),
            Airmass::BelowHorizon => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Airmass::Defined(_))
    }
}

impl From<Option<f64>> for Airmass {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Airmass::BelowHorizon, Airmass::Defined)
    }
}

impl From<Airmass> for Option<f64> {
    fn from(a: Airmass) -> Self {
        a.value()
    }
}

/// Span of a night covered by the samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NightWindow {
    /// From `hours_before` sunset to `hours_after` sunrise.
    SunsetSunrise { hours_before: f64, hours_after: f64 },
    /// Symmetric window around local midnight.
    AroundMidnight { half_width_hours: f64 },
}

impl NightWindow {
    /// Longest accepted margin or half-width, in hours.
    pub const MAX_HOURS: f64 = 24.0;

    /// Margins must lie in [0, 24] hours and a half-width in (0, 24].
    pub fn validate(&self) -> PlannerResult<()> {
        match *self {
            NightWindow::SunsetSunrise {
                hours_before,
                hours_after,
            } => {
                check_hours("hours_before", hours_before, 0.0 <= hours_before)?;
                check_hours("hours_after", hours_after, 0.0 <= hours_after)
            }
            NightWindow::AroundMidnight { half_width_hours } => {
                check_hours("view_range", half_width_hours, 0.0 < half_width_hours)
            }
        }
    }
}

fn check_hours(name: &str, hours: f64, lower_ok: bool) -> PlannerResult<()> {
    if hours.is_finite() && lower_ok && hours <= NightWindow::MAX_HOURS {
        Ok(())
    } else {
        Err(PlannerError::InvalidWindow(format!(
            "{} must be a finite number of hours up to {}, got {}",
            name,
            NightWindow::MAX_HOURS,
            hours
        )))
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        NightWindow::SunsetSunrise {
            hours_before: 1.0,
            hours_after: 1.0,
        }
    }
}

/// How a night is sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    pub window: NightWindow,
    pub time_resolution: Duration,
}

impl VisibilityOptions {
    /// Smallest accepted sampling step.
    pub const MIN_RESOLUTION_SECS: i64 = 60;

    pub fn new(window: NightWindow, time_resolution: Duration) -> Self {
        let floor = Duration::seconds(Self::MIN_RESOLUTION_SECS);
        Self {
            window,
            time_resolution: time_resolution.max(floor),
        }
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self::from(&VisibilitySettings::default())
    }
}

impl From<&VisibilitySettings> for VisibilityOptions {
    fn from(settings: &VisibilitySettings) -> Self {
        Self::new(
            NightWindow::SunsetSunrise {
                hours_before: settings.hours_before_sunset,
                hours_after: settings.hours_after_sunrise,
            },
            Duration::minutes(settings.time_resolution_minutes as i64),
        )
    }
}

/// One point of a visibility curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySample {
    pub time: DateTime<Utc>,
    /// Signed hours from local midnight.
    pub hours_from_midnight: f64,
    pub target_altitude: Degrees,
    pub target_azimuth: Degrees,
    pub airmass: Airmass,
    pub moon_altitude: Degrees,
    pub moon_separation: Degrees,
    pub sun_altitude: Degrees,
}

/// Moon track sample, shared by all targets of a night.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonSample {
    pub time: DateTime<Utc>,
    pub hours_from_midnight: f64,
    pub altitude: Degrees,
}

/// Quick-look figures for a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySummary {
    pub peak_altitude: Degrees,
    pub peak_time: DateTime<Utc>,
    pub min_airmass: Airmass,
    /// Hours above the altitude limit during astronomical night.
    pub observable_hours: f64,
}

/// Visibility of one target over one night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub date: NaiveDate,
    pub local_midnight: DateTime<Utc>,
    pub time_resolution_minutes: f64,
    pub twilight: TwilightTimes,
    pub moon_illumination: f64,
    pub samples: Vec<VisibilitySample>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn step(&self) -> Duration {
        Duration::milliseconds((self.time_resolution_minutes * 60_000.0).round() as i64)
    }

    /// Dark periods with the target at or above `min_altitude`.
    ///
    /// Each qualifying sample covers one sampling step, clipped to the end of
    /// the series; adjacent coverage is merged.
    pub fn observable_periods(&self, min_altitude: Degrees) -> Vec<Period> {
        let dark = TwilightLevel::Astronomical.altitude();
        let step = self.step();
        let Some(end) = self.samples.last().map(|s| s.time) else {
            return Vec::new();
        };

        let covered = self
            .samples
            .iter()
            .filter(|s| s.sun_altitude <= dark && s.target_altitude >= min_altitude)
            .filter_map(|s| Period::new(s.time, (s.time + step).min(end)))
            .collect();
        merge_periods(covered)
    }

    pub fn summary(&self, min_altitude: Degrees) -> Option<VisibilitySummary> {
        let peak = self.samples.iter().max_by(|a, b| {
            a.target_altitude
                .value()
                .total_cmp(&b.target_altitude.value())
        })?;

        let observable_hours = self
            .observable_periods(min_altitude)
            .iter()
            .map(Period::duration_hours)
            .sum();

        Some(VisibilitySummary {
            peak_altitude: peak.target_altitude,
            peak_time: peak.time,
            min_airmass: peak.airmass,
            observable_hours,
        })
    }

    /// True when the target never rises during the sampled window.
    pub fn never_rises(&self) -> bool {
        self.samples.iter().all(|s| !s.airmass.is_defined())
    }
}

/// Site- and night-dependent quantities shared by every target.
#[derive(Debug, Clone)]
pub struct NightContext {
    site: ObservingSite,
    date: NaiveDate,
    local_midnight: DateTime<Utc>,
    resolution: Duration,
    twilight: TwilightTimes,
    moon_illumination: f64,
    observer: Geodetic<ECEF>,
    frames: Vec<SkySample>,
}

/// Per-sample quantities that do not depend on the target.
#[derive(Debug, Clone, Copy)]
struct SkySample {
    time: DateTime<Utc>,
    mjd: SiderustMJD,
    sun_altitude: Degrees,
    moon: Horizontal,
}

/// Topocentric altitude and azimuth (north through east), in degrees.
#[derive(Debug, Clone, Copy)]
struct Horizontal {
    altitude: f64,
    azimuth: f64,
}

impl Horizontal {
    fn of<T: AltitudeProvider + AzimuthProvider>(
        body: &T,
        observer: &Geodetic<ECEF>,
        mjd: SiderustMJD,
    ) -> Self {
        Self {
            altitude: body.altitude_at(observer, mjd).value().to_degrees(),
            azimuth: body.azimuth_at(observer, mjd).value().to_degrees(),
        }
    }

    /// Great-circle distance on the local sky.
    fn separation(&self, other: &Horizontal) -> Degrees {
        let (alt1, alt2) = (self.altitude.to_radians(), other.altitude.to_radians());
        let d_alt = alt2 - alt1;
        let d_az = (other.azimuth - self.azimuth).to_radians();
        let h = (d_alt / 2.0).sin().powi(2) + alt1.cos() * alt2.cos() * (d_az / 2.0).sin().powi(2);
        Degrees::new((2.0 * h.sqrt().min(1.0).asin()).to_degrees())
    }
}

/// Geocentric illuminated fraction of the Moon at `mjd`.
fn moon_illumination(mjd: SiderustMJD) -> f64 {
    let jd = JulianDate::new(mjd.raw().value() + 2_400_000.5);
    moon_phase_geocentric::<Vsop87Ephemeris>(jd).illuminated_fraction.value()
}

impl NightContext {
    pub fn new(site: &ObservingSite, date: NaiveDate, options: &VisibilityOptions) -> Self {
        let twilight = twilight_times(site, date);
        let local_midnight = site.local_midnight(date);
        let (start, stop) = sample_window(site, date, &twilight, local_midnight, &options.window);
        let axis = TimeAxis::new(local_midnight);
        let observer = site.geodetic();

        let mut frames = Vec::new();
        let mut t = start;
        while t <= stop {
            let mjd = axis.mjd(t);
            frames.push(SkySample {
                time: t,
                mjd,
                sun_altitude: Degrees::new(Sun.altitude_at(&observer, mjd).value().to_degrees()),
                moon: Horizontal::of(&Moon, &observer, mjd),
            });
            t += options.time_resolution;
        }

        log::debug!(
            "Night {} at {}: {} samples from {} to {}",
            date,
            site.name(),
            frames.len(),
            start,
            stop
        );

        Self {
            site: site.clone(),
            date,
            local_midnight,
            resolution: options.time_resolution,
            twilight,
            moon_illumination: moon_illumination(axis.mjd(local_midnight)),
            observer,
            frames,
        }
    }

    pub fn site(&self) -> &ObservingSite {
        &self.site
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn twilight(&self) -> &TwilightTimes {
        &self.twilight
    }

    pub fn moon_illumination(&self) -> f64 {
        self.moon_illumination
    }

    pub fn local_midnight(&self) -> DateTime<Utc> {
        self.local_midnight
    }

    fn hours_from_midnight(&self, t: DateTime<Utc>) -> f64 {
        (t - self.local_midnight).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn moon_track(&self) -> Vec<MoonSample> {
        self.frames
            .iter()
            .map(|frame| MoonSample {
                time: frame.time,
                hours_from_midnight: self.hours_from_midnight(frame.time),
                altitude: Degrees::new(frame.moon.altitude),
            })
            .collect()
    }

    /// Visibility series of an ICRS (J2000) target over this night.
    pub fn series(&self, target: &Coordinate) -> TimeSeries {
        let direction = ICRS::new(
            siderust::qtty::Degrees::new(target.ra_deg()),
            siderust::qtty::Degrees::new(target.dec_deg()),
        );
        let samples = self
            .frames
            .iter()
            .map(|frame| {
                let horizontal = Horizontal::of(&direction, &self.observer, frame.mjd);
                let altitude = Degrees::new(horizontal.altitude);
                VisibilitySample {
                    time: frame.time,
                    hours_from_midnight: self.hours_from_midnight(frame.time),
                    target_altitude: altitude,
                    target_azimuth: Degrees::new(horizontal.azimuth),
                    airmass: Airmass::from_altitude(altitude),
                    moon_altitude: Degrees::new(frame.moon.altitude),
                    moon_separation: horizontal.separation(&frame.moon),
                    sun_altitude: frame.sun_altitude,
                }
            })
            .collect();

        TimeSeries {
            date: self.date,
            local_midnight: self.local_midnight,
            time_resolution_minutes: self.resolution.num_seconds() as f64 / 60.0,
            twilight: self.twilight.clone(),
            moon_illumination: self.moon_illumination,
            samples,
        }
    }
}

/// Window offsets are clamped to [0, MAX_HOURS]; callers validate first.
fn hours(h: f64) -> Duration {
    let h = if h.is_nan() { 0.0 } else { h.clamp(0.0, NightWindow::MAX_HOURS) };
    Duration::milliseconds((h * 3_600_000.0).round() as i64)
}

/// Start and stop of the sampled window.
///
/// When the Sun does not set or rise that night, the sunset/sunrise window
/// falls back to the full noon-to-noon night.
fn sample_window(
    site: &ObservingSite,
    date: NaiveDate,
    twilight: &TwilightTimes,
    local_midnight: DateTime<Utc>,
    window: &NightWindow,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match *window {
        NightWindow::SunsetSunrise {
            hours_before,
            hours_after,
        } => {
            let noon = site.local_noon(date);
            let start = twilight
                .sunset
                .map(|t| t - hours(hours_before))
                .unwrap_or(noon);
            let stop = twilight
                .sunrise
                .map(|t| t + hours(hours_after))
                .unwrap_or(noon + Duration::hours(24));
            (start, stop)
        }
        NightWindow::AroundMidnight { half_width_hours } => {
            let half = hours(half_width_hours);
            (local_midnight - half, local_midnight + half)
        }
    }
}

/// Visibility of `target` from `site` on the night of `date`.
pub fn compute_visibility(
    target: &Coordinate,
    site: &ObservingSite,
    date: NaiveDate,
    options: &VisibilityOptions,
) -> TimeSeries {
    NightContext::new(site, date, options).series(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteRegistry;
    use proptest::prelude::*;

    fn palomar() -> ObservingSite {
        SiteRegistry::builtin().lookup("Palomar").unwrap()
    }

    fn night() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 2, 25).unwrap()
    }

    #[test]
    fn test_airmass_at_zenith_and_horizon() {
        assert_eq!(Airmass::from_altitude(Degrees::new(90.0)).value(), Some(1.0));
        assert_eq!(Airmass::from_altitude(Degrees::new(0.0)), Airmass::BelowHorizon);
        assert_eq!(Airmass::from_altitude(Degrees::new(-5.0)), Airmass::BelowHorizon);
        let am30 = Airmass::from_altitude(Degrees::new(30.0)).value().unwrap();
        assert!((am30 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_airmass_serialization() {
        assert_eq!(serde_json::to_string(&Airmass::BelowHorizon).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Airmass::Defined(1.5)).unwrap(), "1.5");
        let back: Airmass = serde_json::from_str("null").unwrap();
        assert_eq!(back, Airmass::BelowHorizon);
    }

    #[test]
    fn test_m82_series_from_palomar() {
        let m82 = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
        let series = compute_visibility(&m82, &palomar(), night(), &VisibilityOptions::default());

        assert!(!series.is_empty());
        // Samples are ordered and evenly spaced
        for pair in series.samples.windows(2) {
            assert_eq!((pair[1].time - pair[0].time).num_minutes(), 10);
        }
        // The window runs from one hour before sunset to one hour after sunrise
        let sunset = series.twilight.sunset.unwrap();
        let sunrise = series.twilight.sunrise.unwrap();
        assert_eq!(series.samples[0].time, sunset - Duration::hours(1));
        assert!(series.samples.last().unwrap().time <= sunrise + Duration::hours(1));

        // M82 culminates near 53.8° at Palomar: 90 - (69.57 - 33.36)
        let summary = series.summary(Degrees::new(30.0)).unwrap();
        assert!((summary.peak_altitude.value() - 53.7).abs() < 0.5, "peak {}", summary.peak_altitude.value());
        assert!(summary.observable_hours > 5.0);
        assert!(summary.min_airmass.value().unwrap() < 1.3);
    }

    #[test]
    fn test_target_below_horizon_all_night() {
        let southern = Coordinate::from_degrees(120.0, -80.0).unwrap();
        let series = compute_visibility(&southern, &palomar(), night(), &VisibilityOptions::default());

        assert!(series.never_rises());
        assert!(series.samples.iter().all(|s| s.target_altitude.value() < 0.0));
        assert!(series.observable_periods(Degrees::new(0.0)).is_empty());
        // Twilight is still reported
        assert!(series.twilight.sunset.is_some());
        assert!(series.twilight.astronomical_night().is_some());
    }

    #[test]
    fn test_window_around_midnight() {
        let options = VisibilityOptions::new(
            NightWindow::AroundMidnight { half_width_hours: 4.0 },
            Duration::minutes(30),
        );
        let ctx = NightContext::new(&palomar(), night(), &options);
        let track = ctx.moon_track();
        assert_eq!(track.len(), 17);
        assert_eq!(track[0].hours_from_midnight, -4.0);
        assert_eq!(track[16].hours_from_midnight, 4.0);
    }

    #[test]
    fn test_horizontal_separation() {
        let east = Horizontal { altitude: 0.0, azimuth: 90.0 };
        let north = Horizontal { altitude: 0.0, azimuth: 0.0 };
        let zenith = Horizontal { altitude: 90.0, azimuth: 200.0 };
        assert!((east.separation(&north).value() - 90.0).abs() < 1e-9);
        assert!((zenith.separation(&north).value() - 90.0).abs() < 1e-9);
        assert!(east.separation(&east).value().abs() < 1e-9);
        // Azimuth wraps through north
        let a = Horizontal { altitude: 10.0, azimuth: 359.0 };
        let b = Horizontal { altitude: 10.0, azimuth: 1.0 };
        assert!(a.separation(&b).value() < 2.0);
    }

    #[test]
    fn test_moon_phase_and_track() {
        // Full Moon on 2022-02-16, new Moon on 2022-03-02
        let full = NightContext::new(
            &palomar(),
            NaiveDate::from_ymd_opt(2022, 2, 16).unwrap(),
            &VisibilityOptions::default(),
        );
        assert!(full.moon_illumination() > 0.95, "{}", full.moon_illumination());

        let ctx = NightContext::new(&palomar(), night(), &VisibilityOptions::default());
        let k = ctx.moon_illumination();
        assert!(k > 0.1 && k < 0.35, "{}", k);
        // A waning crescent rises in the early morning
        let track = ctx.moon_track();
        assert!(track.first().unwrap().altitude.value() < 0.0);
        assert!(track.iter().any(|m| m.altitude.value() > 0.0));
    }

    #[test]
    fn test_window_validation() {
        assert!(NightWindow::default().validate().is_ok());
        let margins = NightWindow::SunsetSunrise { hours_before: 0.0, hours_after: 24.0 };
        assert!(margins.validate().is_ok());

        for bad in [0.0, -5.0, 24.5, 1e13, f64::NAN, f64::INFINITY] {
            let window = NightWindow::AroundMidnight { half_width_hours: bad };
            assert!(
                matches!(window.validate(), Err(PlannerError::InvalidWindow(_))),
                "accepted {}",
                bad
            );
        }
        let margins = NightWindow::SunsetSunrise { hours_before: -1.0, hours_after: 1.0 };
        assert!(margins.validate().is_err());
        let margins = NightWindow::SunsetSunrise { hours_before: 1.0, hours_after: f64::NAN };
        assert!(margins.validate().is_err());
    }

    /// Unvalidated windows are clamped rather than overflowing the clock
    #[test]
    fn test_oversized_window_is_clamped() {
        let options = VisibilityOptions::new(
            NightWindow::AroundMidnight { half_width_hours: 1e13 },
            Duration::hours(6),
        );
        let track = NightContext::new(&palomar(), night(), &options).moon_track();
        assert_eq!(track.len(), 9);
        assert_eq!(track[0].hours_from_midnight, -24.0);
    }

    #[test]
    fn test_resolution_has_a_floor() {
        let options = VisibilityOptions::new(NightWindow::default(), Duration::seconds(0));
        assert_eq!(options.time_resolution, Duration::seconds(60));
    }

    #[test]
    fn test_series_is_recomputable() {
        let m82 = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
        let ctx = NightContext::new(&palomar(), night(), &VisibilityOptions::default());
        assert_eq!(ctx.series(&m82), ctx.series(&m82));
    }

    proptest! {
        #[test]
        fn prop_airmass_monotonic(a in 0.01f64..90.0, b in 0.01f64..90.0) {
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            let am_low = Airmass::from_altitude(Degrees::new(low)).value().unwrap();
            let am_high = Airmass::from_altitude(Degrees::new(high)).value().unwrap();
            prop_assert!(am_low >= am_high);
            prop_assert!(am_high >= 1.0 - 1e-12);
        }
    }
}
