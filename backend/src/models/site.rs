//! Observing sites.
//!
//! An [`ObservingSite`] is immutable once built. Sites are either looked up by
//! name in a [`SiteRegistry`] (built-in observatories plus any configured in
//! `observing.toml`) or constructed from explicit geodetic values.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use qtty::{Degrees, Meters};
use serde::{Deserialize, Serialize};
use siderust::coordinates::centers::Geodetic;
use siderust::coordinates::frames::ECEF;

use crate::error::{PlannerError, PlannerResult};

/// Geodetic description of a site as supplied by configuration or callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub name: String,
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees, east positive (-180 to 180)
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
    /// Hours from UTC; derived from the longitude when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Observer location plus the local clock convention used for night dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SiteSpec", into = "SiteSpec")]
pub struct ObservingSite {
    name: String,
    latitude: Degrees,
    longitude: Degrees,
    altitude: Meters,
    utc_offset: f64,
}

impl ObservingSite {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude_m: f64,
        utc_offset: f64,
    ) -> PlannerResult<Self> {
        let name = name.into();
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PlannerError::InvalidSite(format!(
                "{}: latitude must be between -90 and 90 degrees",
                name
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(PlannerError::InvalidSite(format!(
                "{}: longitude must be between -180 and 180 degrees",
                name
            )));
        }
        if !altitude_m.is_finite() {
            return Err(PlannerError::InvalidSite(format!(
                "{}: altitude must be finite",
                name
            )));
        }
        // Offsets outside [-12, +14] hours do not exist on any civil clock.
        if !(-12.0..=14.0).contains(&utc_offset) {
            return Err(PlannerError::InvalidSite(format!(
                "{}: UTC offset {} outside [-12, 14] hours",
                name, utc_offset
            )));
        }

        Ok(Self {
            name,
            latitude: Degrees::new(latitude),
            longitude: Degrees::new(longitude),
            altitude: Meters::new(altitude_m),
            utc_offset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> Degrees {
        self.latitude
    }

    pub fn longitude(&self) -> Degrees {
        self.longitude
    }

    pub fn altitude(&self) -> Meters {
        self.altitude
    }

    /// WGS84 observer position for siderust's event searches.
    pub fn geodetic(&self) -> Geodetic<ECEF> {
        Geodetic::<ECEF>::new(
            siderust::qtty::Degrees::new(self.longitude.value()),
            siderust::qtty::Degrees::new(self.latitude.value()),
            siderust::qtty::Meters::new(self.altitude.value()),
        )
    }

    pub fn utc_offset_hours(&self) -> f64 {
        self.utc_offset
    }

    pub fn timezone(&self) -> FixedOffset {
        let seconds = (self.utc_offset * 3600.0).round() as i32;
        FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
    }

    pub fn local_time(&self, t: DateTime<Utc>) -> DateTime<FixedOffset> {
        t.with_timezone(&self.timezone())
    }

    /// UTC instant of the given local wall-clock time on `date`.
    pub fn local_to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        let naive_utc = local - Duration::seconds((self.utc_offset * 3600.0).round() as i64);
        Utc.from_utc_datetime(&naive_utc)
    }

    /// Local noon on `date`, which opens the night labelled `date`.
    pub fn local_noon(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date, NaiveTime::MIN) + Duration::hours(12)
    }

    /// Local midnight closing the evening of `date`.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date, NaiveTime::MIN) + Duration::hours(24)
    }
}

impl TryFrom<SiteSpec> for ObservingSite {
    type Error = PlannerError;

    fn try_from(spec: SiteSpec) -> Result<Self, Self::Error> {
        let utc_offset = spec
            .utc_offset
            .unwrap_or_else(|| (spec.longitude / 15.0).round());
        ObservingSite::new(
            spec.name,
            spec.latitude,
            spec.longitude,
            spec.altitude_m,
            utc_offset,
        )
    }
}

impl From<ObservingSite> for SiteSpec {
    fn from(site: ObservingSite) -> Self {
        SiteSpec {
            name: site.name,
            latitude: site.latitude.value(),
            longitude: site.longitude.value(),
            altitude_m: site.altitude.value(),
            utc_offset: Some(site.utc_offset),
            aliases: Vec::new(),
        }
    }
}

/// A site given either by name or by explicit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SiteRequest {
    Named(String),
    Explicit(SiteSpec),
}

impl SiteRequest {
    pub fn resolve(&self, registry: &SiteRegistry) -> PlannerResult<ObservingSite> {
        match self {
            SiteRequest::Named(name) => registry.lookup(name),
            SiteRequest::Explicit(spec) => ObservingSite::try_from(spec.clone()),
        }
    }
}

// name, latitude, longitude, altitude (m), UTC offset (h), aliases
const BUILTIN_SITES: &[(&str, f64, f64, f64, f64, &[&str])] = &[
    ("Palomar", 33.3563, -116.8650, 1706.0, -8.0, &["p200", "hale"]),
    ("Keck", 19.8263, -155.4748, 4160.0, -10.0, &["maunakea", "wmko"]),
    ("Subaru", 19.8255, -155.4761, 4139.0, -10.0, &["naoj"]),
    ("Lick", 37.3414, -121.6429, 1283.0, -8.0, &["mthamilton"]),
    ("Kitt Peak", 31.9583, -111.5967, 2096.0, -7.0, &["kpno"]),
    ("Apache Point", 32.7803, -105.8203, 2798.0, -7.0, &["apo"]),
    ("Paranal", -24.6272, -70.4042, 2635.0, -4.0, &["vlt", "eso"]),
    ("La Silla", -29.2567, -70.7300, 2347.0, -4.0, &["lasilla"]),
    ("Cerro Tololo", -30.1652, -70.8150, 2215.0, -4.0, &["ctio"]),
    ("Las Campanas", -29.0146, -70.6926, 2380.0, -4.0, &["lco", "magellan"]),
    (
        "Roque de los Muchachos",
        28.7624,
        -17.8892,
        2396.0,
        0.0,
        &["lapalma", "orm"],
    ),
    ("Greenwich", 51.4769, 0.0, 46.0, 0.0, &["rog"]),
];

fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lookup table of known observatories.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    entries: Vec<(Vec<String>, ObservingSite)>,
}

impl SiteRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in observatories.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, lat, lon, alt, offset, aliases) in BUILTIN_SITES {
            match ObservingSite::new(*name, *lat, *lon, *alt, *offset) {
                Ok(site) => registry.register(site, *aliases),
                Err(e) => log::error!("Skipping built-in site {}: {}", name, e),
            }
        }
        registry
    }

    /// Built-in observatories extended (or overridden) by `extra`.
    pub fn with_sites(extra: &[SiteSpec]) -> PlannerResult<Self> {
        let mut registry = Self::builtin();
        for spec in extra {
            let site = ObservingSite::try_from(spec.clone())?;
            registry.register(site, &spec.aliases);
        }
        Ok(registry)
    }

    /// Add a site. A later registration wins over an earlier one sharing a key.
    pub fn register<S: AsRef<str>>(&mut self, site: ObservingSite, aliases: &[S]) {
        let mut keys = vec![normalize_key(site.name())];
        keys.extend(aliases.iter().map(|a| normalize_key(a.as_ref())));

        for (existing_keys, _) in &mut self.entries {
            existing_keys.retain(|k| !keys.contains(k));
        }
        self.entries.retain(|(k, _)| !k.is_empty());
        self.entries.push((keys, site));
    }

    /// Case, space and punctuation insensitive lookup.
    pub fn lookup(&self, name: &str) -> PlannerResult<ObservingSite> {
        let key = normalize_key(name);
        self.entries
            .iter()
            .rev()
            .find(|(keys, _)| keys.contains(&key))
            .map(|(_, site)| site.clone())
            .ok_or_else(|| PlannerError::UnknownSite(name.to_string()))
    }

    pub fn sites(&self) -> impl Iterator<Item = &ObservingSite> {
        self.entries.iter().map(|(_, site)| site)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
