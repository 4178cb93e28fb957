//! Celestial coordinates and angle units.
//!
//! A [`Coordinate`] is an equatorial direction (right ascension, declination)
//! tagged with its reference frame. Angles are carried as `qtty` quantities so
//! degree/arcsecond/hour-angle conversions stay explicit at the type level.

use qtty::{Arcminute, Arcsecond, Degree, Degrees, HourAngle, Radian};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PlannerError, PlannerResult};

/// Reference frame of an equatorial coordinate.
///
/// `Fk5` is taken at equinox J2000 and treated as coincident with ICRS; the
/// frame tie (tens of milliarcseconds) is far below what visibility or blind
/// offsets need. `Galactic` is only accepted on input and is rotated into ICRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    #[default]
    Icrs,
    Fk5,
    Galactic,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frame::Icrs => "icrs",
            Frame::Fk5 => "fk5",
            Frame::Galactic => "galactic",
        };
        f.write_str(s)
    }
}

impl FromStr for Frame {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "icrs" => Ok(Frame::Icrs),
            "fk5" | "j2000" => Ok(Frame::Fk5),
            "galactic" | "gal" => Ok(Frame::Galactic),
            other => Err(PlannerError::InvalidCoordinate(format!(
                "unknown reference frame '{}'",
                other
            ))),
        }
    }
}

/// Unit of a single angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    Degree,
    HourAngle,
    Radian,
    Arcmin,
    Arcsec,
}

impl AngleUnit {
    /// Convert a raw value expressed in this unit to degrees.
    pub fn to_degrees(self, value: f64) -> Degrees {
        match self {
            AngleUnit::Degree => Degrees::new(value),
            AngleUnit::HourAngle => qtty::Quantity::<HourAngle>::new(value).to::<Degree>(),
            AngleUnit::Radian => qtty::Quantity::<Radian>::new(value).to::<Degree>(),
            AngleUnit::Arcmin => qtty::Quantity::<Arcminute>::new(value).to::<Degree>(),
            AngleUnit::Arcsec => qtty::Quantity::<Arcsecond>::new(value).to::<Degree>(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AngleUnit::Degree => "deg",
            AngleUnit::HourAngle => "hourangle",
            AngleUnit::Radian => "rad",
            AngleUnit::Arcmin => "arcmin",
            AngleUnit::Arcsec => "arcsec",
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for AngleUnit {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().trim_start_matches("u.").to_lowercase();
        match token.as_str() {
            "deg" | "degree" | "degrees" | "d" => Ok(AngleUnit::Degree),
            "hourangle" | "hour" | "hours" | "h" | "hms" => Ok(AngleUnit::HourAngle),
            "rad" | "radian" | "radians" => Ok(AngleUnit::Radian),
            "arcmin" | "arcminute" | "arcminutes" | "'" => Ok(AngleUnit::Arcmin),
            "arcsec" | "arcsecond" | "arcseconds" | "\"" => Ok(AngleUnit::Arcsec),
            other => Err(PlannerError::InvalidCoordinate(format!(
                "unknown angle unit '{}'",
                other
            ))),
        }
    }
}

/// Units of a right ascension / declination pair.
///
/// Serialised as its string form (`"hourangle,deg"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoordUnits {
    pub ra: AngleUnit,
    pub dec: AngleUnit,
}

impl CoordUnits {
    pub const DEGREES: CoordUnits = CoordUnits {
        ra: AngleUnit::Degree,
        dec: AngleUnit::Degree,
    };

    pub const HOURANGLE_DEGREES: CoordUnits = CoordUnits {
        ra: AngleUnit::HourAngle,
        dec: AngleUnit::Degree,
    };

    pub fn new(ra: AngleUnit, dec: AngleUnit) -> Self {
        Self { ra, dec }
    }
}

impl fmt::Display for CoordUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.ra, self.dec)
    }
}

/// Accepts `"deg"`, `"hourangle,deg"`, `"(u.hourangle, u.deg)"` and similar.
/// A single unit applies to both axes.
impl FromStr for CoordUnits {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = cleaned
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();

        match parts.as_slice() {
            [single] => {
                let unit = single.parse()?;
                Ok(CoordUnits::new(unit, unit))
            }
            [ra, dec] => Ok(CoordUnits::new(ra.parse()?, dec.parse()?)),
            _ => Err(PlannerError::InvalidCoordinate(format!(
                "cannot interpret coordinate units '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for CoordUnits {
    type Error = PlannerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CoordUnits> for String {
    fn from(units: CoordUnits) -> Self {
        units.to_string()
    }
}

/// Resolved celestial coordinate.
///
/// Deserialization goes through [`Coordinate::in_frame`], so a decoded value
/// is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub ra: Degrees,
    pub dec: Degrees,
    pub frame: Frame,
}

#[derive(Deserialize)]
struct RawCoordinate {
    ra: Degrees,
    dec: Degrees,
    #[serde(default)]
    frame: Frame,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = PlannerError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::in_frame(raw.ra, raw.dec, raw.frame)
    }
}

impl Coordinate {
    /// Build an ICRS coordinate, validating declination and wrapping RA into [0°, 360°).
    pub fn new(ra: Degrees, dec: Degrees) -> PlannerResult<Self> {
        Self::in_frame(ra, dec, Frame::Icrs)
    }

    /// Build an equatorial coordinate in `frame`.
    ///
    /// Galactic input is interpreted as (l, b) and rotated into ICRS.
    pub fn in_frame(ra: Degrees, dec: Degrees, frame: Frame) -> PlannerResult<Self> {
        if !ra.value().is_finite() || !dec.value().is_finite() {
            return Err(PlannerError::InvalidCoordinate(
                "coordinate components must be finite".to_string(),
            ));
        }
        if dec.value().abs() > 90.0 {
            return Err(PlannerError::InvalidCoordinate(format!(
                "latitude-like component {} outside [-90, 90] degrees",
                dec.value()
            )));
        }

        if frame == Frame::Galactic {
            return Ok(galactic_to_icrs(ra, dec));
        }

        Ok(Self {
            ra: ra.wrap_pos(),
            dec,
            frame,
        })
    }

    /// Convenience constructor from raw degrees.
    pub fn from_degrees(ra: f64, dec: f64) -> PlannerResult<Self> {
        Self::new(Degrees::new(ra), Degrees::new(dec))
    }

    pub fn ra_deg(&self) -> f64 {
        self.ra.value()
    }

    pub fn dec_deg(&self) -> f64 {
        self.dec.value()
    }

    /// Cartesian unit vector (x toward RA 0, z toward the pole).
    pub fn unit_vector(&self) -> [f64; 3] {
        let (sin_ra, cos_ra) = self.ra.sin_cos();
        let (sin_dec, cos_dec) = self.dec.sin_cos();
        [cos_ra * cos_dec, sin_ra * cos_dec, sin_dec]
    }

    /// Inverse of [`Coordinate::unit_vector`].
    pub fn from_unit_vector(v: [f64; 3], frame: Frame) -> Self {
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        let dec = (v[2] / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let ra = v[1].atan2(v[0]).to_degrees();
        Self {
            ra: Degrees::new(ra).wrap_pos(),
            dec: Degrees::new(dec),
            frame,
        }
    }

    /// `"09h55m52.72s +69d40m45.7s"`
    pub fn to_hmsdms(&self) -> String {
        let (h, m, s) = split_sexagesimal(self.ra.value() / 15.0, 2);
        let (sign, d, am, as_) = split_signed_sexagesimal(self.dec.value(), 1);
        format!(
            "{:02}h{:02}m{:05.2}s {}{:02}d{:02}m{:04.1}s",
            h, m, s, sign, d, am, as_
        )
    }

    /// `"09 55 52.72 +69 40 45.7"`
    pub fn to_sexagesimal_spaced(&self) -> String {
        self.sexagesimal(' ')
    }

    /// `"09:55:52.72 +69:40:45.7"`
    pub fn to_sexagesimal_colons(&self) -> String {
        self.sexagesimal(':')
    }

    fn sexagesimal(&self, sep: char) -> String {
        let (h, m, s) = split_sexagesimal(self.ra.value() / 15.0, 2);
        let (sign, d, am, as_) = split_signed_sexagesimal(self.dec.value(), 1);
        format!(
            "{:02}{sep}{:02}{sep}{:05.2} {}{:02}{sep}{:02}{sep}{:04.1}",
            h, m, s, sign, d, am, as_
        )
    }

    /// `"148.96969 69.67938"`
    pub fn to_decimal_string(&self) -> String {
        format!("{:.5} {:.5}", self.ra.value(), self.dec.value())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.to_hmsdms(), self.frame)
    }
}

/// Split a positive value into (units, minutes, seconds) with seconds rounded
/// to `decimals` places, carrying overflow so 59.999s never prints as 60.00s.
fn split_sexagesimal(value: f64, decimals: i32) -> (u32, u32, f64) {
    let scale = 10f64.powi(decimals);
    let total = (value * 3600.0 * scale).round() / scale;
    let units = (total / 3600.0).floor();
    let rem = total - units * 3600.0;
    let minutes = (rem / 60.0).floor();
    let seconds = rem - minutes * 60.0;
    (units as u32 % 24, minutes as u32, seconds.max(0.0))
}

fn split_signed_sexagesimal(value: f64, decimals: i32) -> (char, u32, u32, f64) {
    let sign = if value < 0.0 { '-' } else { '+' };
    let scale = 10f64.powi(decimals);
    let total = (value.abs() * 3600.0 * scale).round() / scale;
    let degrees = (total / 3600.0).floor();
    let rem = total - degrees * 3600.0;
    let minutes = (rem / 60.0).floor();
    let seconds = rem - minutes * 60.0;
    (sign, degrees as u32, minutes as u32, seconds.max(0.0))
}

/// Rotation matrix from Galactic to ICRS (Hipparcos definition), row-major.
const GALACTIC_TO_ICRS: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, 0.494_109_427_875_583_7, -0.867_666_149_019_004_7],
    [-0.873_437_090_234_885_0, -0.444_829_629_960_011_2, -0.198_076_373_431_201_5],
    [-0.483_835_015_548_713_2, 0.746_982_244_497_218_9, 0.455_983_776_175_066_9],
];

fn galactic_to_icrs(l: Degrees, b: Degrees) -> Coordinate {
    let (sin_l, cos_l) = l.sin_cos();
    let (sin_b, cos_b) = b.sin_cos();
    let g = [cos_l * cos_b, sin_l * cos_b, sin_b];

    let mut v = [0.0; 3];
    for (i, row) in GALACTIC_TO_ICRS.iter().enumerate() {
        v[i] = row[0] * g[0] + row[1] * g[1] + row[2] * g[2];
    }

    Coordinate::from_unit_vector(v, Frame::Icrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ra_is_wrapped() {
        let c = Coordinate::from_degrees(-10.0, 20.0).unwrap();
        assert!((c.ra_deg() - 350.0).abs() < 1e-12);
        let c = Coordinate::from_degrees(370.0, 20.0).unwrap();
        assert!((c.ra_deg() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_declination_out_of_range_is_invalid() {
        let err = Coordinate::from_degrees(10.0, 91.0).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidCoordinate(_)));
        assert!(Coordinate::from_degrees(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_unit_vector_roundtrip() {
        let c = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
        let back = Coordinate::from_unit_vector(c.unit_vector(), Frame::Icrs);
        assert!((back.ra_deg() - c.ra_deg()).abs() < 1e-9);
        assert!((back.dec_deg() - c.dec_deg()).abs() < 1e-9);
    }

    #[test]
    fn test_hmsdms_formatting() {
        // 09h55m52.7s +69d40m47s
        let c = Coordinate::from_degrees(148.969583, 69.679722).unwrap();
        assert_eq!(c.to_hmsdms(), "09h55m52.70s +69d40m47.0s");
        assert_eq!(c.to_sexagesimal_spaced(), "09 55 52.70 +69 40 47.0");

        let south = Coordinate::from_degrees(83.8221, -5.3911).unwrap();
        assert!(south.to_hmsdms().contains(" -05d23m"));
    }

    #[test]
    fn test_sexagesimal_separators() {
        let c = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
        assert_eq!(c.to_sexagesimal_spaced(), "09 55 52.44 +69 40 46.9");
        assert_eq!(c.to_sexagesimal_colons(), "09:55:52.44 +69:40:46.9");
    }

    #[test]
    fn test_galactic_center_maps_to_sagittarius() {
        // l = 0, b = 0 lies at RA 266.405, Dec -28.936 (ICRS)
        let c = Coordinate::in_frame(Degrees::new(0.0), Degrees::new(0.0), Frame::Galactic).unwrap();
        assert_eq!(c.frame, Frame::Icrs);
        assert!((c.ra_deg() - 266.405).abs() < 0.01);
        assert!((c.dec_deg() - (-28.936)).abs() < 0.01);
    }

    #[test]
    fn test_units_parsing() {
        assert_eq!("deg".parse::<CoordUnits>().unwrap(), CoordUnits::DEGREES);
        assert_eq!(
            "hourangle,deg".parse::<CoordUnits>().unwrap(),
            CoordUnits::HOURANGLE_DEGREES
        );
        assert_eq!(
            "(u.hourangle, u.deg)".parse::<CoordUnits>().unwrap(),
            CoordUnits::HOURANGLE_DEGREES
        );
        assert!("furlong".parse::<CoordUnits>().is_err());

        let json = serde_json::to_string(&CoordUnits::HOURANGLE_DEGREES).unwrap();
        assert_eq!(json, r#""hourangle,deg""#);
        let units: CoordUnits = serde_json::from_str(r#""deg""#).unwrap();
        assert_eq!(units, CoordUnits::DEGREES);
    }

    #[test]
    fn test_angle_unit_conversion() {
        assert!((AngleUnit::HourAngle.to_degrees(1.0).value() - 15.0).abs() < 1e-12);
        assert!((AngleUnit::Arcsec.to_degrees(3600.0).value() - 1.0).abs() < 1e-12);
        assert!((AngleUnit::Radian.to_degrees(std::f64::consts::PI).value() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_from_str() {
        assert_eq!("ICRS".parse::<Frame>().unwrap(), Frame::Icrs);
        assert_eq!("j2000".parse::<Frame>().unwrap(), Frame::Fk5);
        assert!("ecliptic".parse::<Frame>().is_err());
    }
}
