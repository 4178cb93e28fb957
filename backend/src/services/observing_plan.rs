//! Observing plan: targets, a site and a set of nights.
//!
//! The plan borrows its targets and never mutates them. Every (night, target)
//! evaluation is independent; the per-night Sun and Moon work is shared
//! through a [`NightContext`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use crate::config::VisibilitySettings;
use crate::error::{Outcome, PlannerError, PlannerResult, StoreWarning};
use crate::models::{Coordinate, ObservingSite, Period, Target};
use crate::services::astronomical_night::TwilightTimes;
use crate::services::starlist::{render_starlist, StarlistFormat};
use crate::services::visibility_computer::{
    MoonSample, NightContext, NightWindow, TimeSeries, VisibilityOptions, VisibilitySummary,
};

/// Parse a night date such as `"2022-02-25"` or `"2022/02/25"`.
pub fn parse_night_date(s: &str) -> PlannerResult<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map_err(|e| PlannerError::InvalidDate(format!("'{}': {}", s, e)))
}

/// Which plan targets a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SelectorRepr", into = "SelectorRepr")]
pub enum TargetSelector {
    #[default]
    All,
    Named(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    One(String),
    Many(Vec<String>),
}

impl From<SelectorRepr> for TargetSelector {
    fn from(repr: SelectorRepr) -> Self {
        match repr {
            SelectorRepr::One(s) if s == "all" => TargetSelector::All,
            SelectorRepr::One(s) => TargetSelector::Named(vec![s]),
            SelectorRepr::Many(names) => TargetSelector::Named(names),
        }
    }
}

impl From<TargetSelector> for SelectorRepr {
    fn from(selector: TargetSelector) -> Self {
        match selector {
            TargetSelector::All => SelectorRepr::One("all".to_string()),
            TargetSelector::Named(names) => SelectorRepr::Many(names),
        }
    }
}

/// Parameters of a visibility query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityRequest {
    pub targets: TargetSelector,
    /// Half-width in hours of a window centred on local midnight. The
    /// sunset/sunrise window is used when unset.
    pub view_range: Option<f64>,
    pub time_resolution: Option<Duration>,
}

impl VisibilityRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn targets(mut self, targets: TargetSelector) -> Self {
        self.targets = targets;
        self
    }

    pub fn view_range(mut self, hours: f64) -> Self {
        self.view_range = Some(hours);
        self
    }

    pub fn time_resolution(mut self, step: Duration) -> Self {
        self.time_resolution = Some(step);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetVisibility {
    pub target: String,
    pub coordinate: Coordinate,
    pub summary: Option<VisibilitySummary>,
    pub observable: Vec<Period>,
    pub series: TimeSeries,
}

/// Everything a renderer needs to draw one night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVisibility {
    pub date: NaiveDate,
    pub site: String,
    pub local_midnight: DateTime<Utc>,
    pub twilight: TwilightTimes,
    pub moon_illumination: f64,
    pub moon: Vec<MoonSample>,
    pub min_altitude: Degrees,
    pub targets: Vec<TargetVisibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightlySummary {
    pub date: NaiveDate,
    pub target: String,
    pub astronomical_night: Option<Period>,
    pub moon_illumination: f64,
    pub summary: Option<VisibilitySummary>,
}

#[derive(Debug, Clone)]
pub struct ObservingPlan<'t> {
    targets: Vec<&'t Target>,
    site: ObservingSite,
    dates: Vec<NaiveDate>,
    options: VisibilityOptions,
    min_altitude: Degrees,
}

impl<'t> ObservingPlan<'t> {
    /// Build a plan; the nights are sorted and de-duplicated.
    pub fn new<T, D>(targets: T, site: ObservingSite, dates: D) -> PlannerResult<Self>
    where
        T: IntoIterator<Item = &'t Target>,
        D: IntoIterator<Item = NaiveDate>,
    {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort();
        dates.dedup();
        if dates.is_empty() {
            return Err(PlannerError::InvalidDate(
                "an observing plan needs at least one night".to_string(),
            ));
        }

        let targets: Vec<&Target> = targets.into_iter().collect();
        log::info!(
            "Observing plan at {}: {} targets over {} nights ({} to {})",
            site.name(),
            targets.len(),
            dates.len(),
            dates[0],
            dates[dates.len() - 1]
        );

        let settings = VisibilitySettings::default();
        Ok(Self {
            targets,
            site,
            dates,
            options: VisibilityOptions::from(&settings),
            min_altitude: Degrees::new(settings.min_altitude_deg),
        })
    }

    /// Sampling and altitude limit from configuration.
    pub fn with_settings(mut self, settings: &VisibilitySettings) -> Self {
        self.options = VisibilityOptions::from(settings);
        self.min_altitude = Degrees::new(settings.min_altitude_deg);
        self
    }

    pub fn site(&self) -> &ObservingSite {
        &self.site
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn targets(&self) -> &[&'t Target] {
        &self.targets
    }

    pub fn min_altitude(&self) -> Degrees {
        self.min_altitude
    }

    fn ensure_date(&self, date: NaiveDate) -> PlannerResult<()> {
        if self.dates.binary_search(&date).is_ok() {
            Ok(())
        } else {
            Err(PlannerError::DateNotInPlan(date))
        }
    }

    fn select(&self, selector: &TargetSelector) -> PlannerResult<Vec<&'t Target>> {
        match selector {
            TargetSelector::All => Ok(self.targets.clone()),
            TargetSelector::Named(names) => names
                .iter()
                .map(|name| {
                    self.targets
                        .iter()
                        .copied()
                        .find(|t| t.name() == name)
                        .ok_or_else(|| PlannerError::TargetNotFound(name.clone()))
                })
                .collect(),
        }
    }

    /// Split targets into those with a coordinate and warnings for the rest.
    fn with_coordinates(targets: Vec<&'t Target>) -> Outcome<Vec<(&'t Target, Coordinate)>> {
        let mut outcome = Outcome::new(Vec::with_capacity(targets.len()));
        for target in targets {
            match target.coordinate() {
                Some(c) => outcome.value.push((target, *c)),
                None => outcome.warn(StoreWarning::TargetWithoutCoordinates {
                    target: target.name().to_string(),
                }),
            }
        }
        outcome
    }

    /// Visibility of the requested targets on one plan night.
    ///
    /// The date, the target names and the sampled window are validated
    /// before anything is computed.
    pub fn plot_visibility(
        &self,
        date: NaiveDate,
        request: &VisibilityRequest,
    ) -> PlannerResult<Outcome<PlanVisibility>> {
        self.ensure_date(date)?;
        let selected = self.select(&request.targets)?;

        let window = match request.view_range {
            Some(hours) => NightWindow::AroundMidnight {
                half_width_hours: hours,
            },
            None => self.options.window,
        };
        window.validate()?;
        let options = VisibilityOptions::new(
            window,
            request.time_resolution.unwrap_or(self.options.time_resolution),
        );

        let ctx = NightContext::new(&self.site, date, &options);
        let min_altitude = self.min_altitude;

        let outcome = Self::with_coordinates(selected).map(|targets| {
            let targets = targets
                .into_iter()
                .map(|(target, coordinate)| {
                    let series = ctx.series(&coordinate);
                    TargetVisibility {
                        target: target.name().to_string(),
                        coordinate,
                        summary: series.summary(min_altitude),
                        observable: series.observable_periods(min_altitude),
                        series,
                    }
                })
                .collect();

            PlanVisibility {
                date,
                site: self.site.name().to_string(),
                local_midnight: ctx.local_midnight(),
                twilight: ctx.twilight().clone(),
                moon_illumination: ctx.moon_illumination(),
                moon: ctx.moon_track(),
                min_altitude,
                targets,
            }
        });

        log::debug!(
            "Visibility for {} on {}: {} targets, {} warnings",
            self.site.name(),
            date,
            outcome.value.targets.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    /// Summary of every (night, target) pair, night-major.
    pub fn nightly_summaries(&self) -> Outcome<Vec<NightlySummary>> {
        let min_altitude = self.min_altitude;
        Self::with_coordinates(self.targets.clone()).map(|targets| {
            let mut rows = Vec::with_capacity(self.dates.len() * targets.len());
            for &date in &self.dates {
                let ctx = NightContext::new(&self.site, date, &self.options);
                for (target, coordinate) in &targets {
                    rows.push(NightlySummary {
                        date,
                        target: target.name().to_string(),
                        astronomical_night: ctx.twilight().astronomical_night(),
                        moon_illumination: ctx.moon_illumination(),
                        summary: ctx.series(coordinate).summary(min_altitude),
                    });
                }
            }
            rows
        })
    }

    /// Target list for every unique configuration in the plan.
    pub fn starlist(&self, format: StarlistFormat) -> String {
        render_starlist(self.targets.iter().copied(), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteRegistry;

    fn palomar() -> ObservingSite {
        SiteRegistry::builtin().lookup("Palomar").unwrap()
    }

    fn night() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 2, 25).unwrap()
    }

    fn targets() -> Vec<Target> {
        vec![
            Target::with_coordinate("M82", Coordinate::from_degrees(148.9685, 69.6797).unwrap()),
            Target::with_coordinate("M101", Coordinate::from_degrees(210.8024, 54.3487).unwrap()),
            Target::new("unresolved"),
        ]
    }

    #[test]
    fn test_parse_night_date() {
        assert_eq!(parse_night_date("2022-02-25").unwrap(), night());
        assert_eq!(parse_night_date(" 2022/02/25 ").unwrap(), night());
        assert!(matches!(parse_night_date("25 Feb"), Err(PlannerError::InvalidDate(_))));
    }

    #[test]
    fn test_plan_requires_nights_and_sorts_them() {
        let targets = targets();
        assert!(ObservingPlan::new(&targets, palomar(), Vec::new()).is_err());

        let later = night() + Duration::days(1);
        let plan = ObservingPlan::new(&targets, palomar(), vec![later, night(), later]).unwrap();
        assert_eq!(plan.dates(), &[night(), later]);
        assert_eq!(plan.targets().len(), 3);
    }

    #[test]
    fn test_date_not_in_plan() {
        let targets = targets();
        let plan = ObservingPlan::new(&targets, palomar(), vec![night()]).unwrap();
        let other = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        let err = plan.plot_visibility(other, &VisibilityRequest::all()).unwrap_err();
        assert_eq!(err, PlannerError::DateNotInPlan(other));
    }

    #[test]
    fn test_plot_visibility_all_targets() {
        let targets = targets();
        let plan = ObservingPlan::new(&targets, palomar(), vec![night()]).unwrap();
        let outcome = plan.plot_visibility(night(), &VisibilityRequest::all()).unwrap();

        assert_eq!(
            outcome.warnings,
            vec![StoreWarning::TargetWithoutCoordinates {
                target: "unresolved".into()
            }]
        );
        let vis = outcome.value;
        assert_eq!(vis.site, "Palomar");
        let names: Vec<_> = vis.targets.iter().map(|t| t.target.as_str()).collect();
        assert_eq!(names, vec!["M82", "M101"]);
        assert_eq!(vis.moon.len(), vis.targets[0].series.len());
        assert!(!vis.targets[0].observable.is_empty());
    }

    #[test]
    fn test_plot_visibility_subset_and_view_range() {
        let targets = targets();
        let plan = ObservingPlan::new(&targets, palomar(), vec![night()]).unwrap();
        let request = VisibilityRequest::all()
            .targets(TargetSelector::Named(vec!["M101".into()]))
            .view_range(6.0)
            .time_resolution(Duration::minutes(15));

        let outcome = plan.plot_visibility(night(), &request).unwrap();
        assert!(!outcome.has_warnings());
        let series = &outcome.value.targets[0].series;
        assert_eq!(series.len(), 49);
        assert_eq!(series.samples[0].hours_from_midnight, -6.0);

        let missing = VisibilityRequest::all().targets(TargetSelector::Named(vec!["M31".into()]));
        assert_eq!(
            plan.plot_visibility(night(), &missing).unwrap_err(),
            PlannerError::TargetNotFound("M31".into())
        );
    }

    #[test]
    fn test_view_range_must_be_within_a_day() {
        let targets = targets();
        let plan = ObservingPlan::new(&targets, palomar(), vec![night()]).unwrap();
        for hours in [1e13, -5.0, 0.0, f64::NAN] {
            let err = plan
                .plot_visibility(night(), &VisibilityRequest::all().view_range(hours))
                .unwrap_err();
            assert!(matches!(err, PlannerError::InvalidWindow(_)), "{} gave {:?}", hours, err);
        }
        assert!(plan
            .plot_visibility(night(), &VisibilityRequest::all().view_range(24.0))
            .is_ok());
    }

    #[test]
    fn test_nightly_summaries_cover_every_pair() {
        let targets = targets();
        let dates = vec![night(), night() + Duration::days(1)];
        let plan = ObservingPlan::new(&targets, palomar(), dates).unwrap();
        let outcome = plan.nightly_summaries();
        assert_eq!(outcome.value.len(), 4);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.value.iter().all(|row| row.astronomical_night.is_some()));
    }

    #[test]
    fn test_target_selector_serde() {
        let all: TargetSelector = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, TargetSelector::All);
        let named: TargetSelector = serde_json::from_str("\"ALL\"").unwrap();
        assert_eq!(named, TargetSelector::Named(vec!["ALL".into()]));
        let one: TargetSelector = serde_json::from_str("\"M82\"").unwrap();
        assert_eq!(one, TargetSelector::Named(vec!["M82".into()]));
        let many: TargetSelector = serde_json::from_str("[\"M82\",\"M101\"]").unwrap();
        assert_eq!(many, TargetSelector::Named(vec!["M82".into(), "M101".into()]));
    }
}
