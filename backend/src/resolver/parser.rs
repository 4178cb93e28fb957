//! Offline parsing of coordinate literals.
//!
//! Nothing in this module touches the network: any input that reaches it is
//! either converted to a [`Coordinate`] or rejected with
//! [`PlannerError::InvalidCoordinate`].

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::models::{AngleUnit, CoordUnits, Coordinate, Frame};

/// Explicit coordinate value supplied by a caller.
///
/// Deserializes from a string (`"148.152 70.1215"`), a two-element array
/// (`[148.152, 70.1215]`) or an already-resolved coordinate object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Text(String),
    Pair(f64, f64),
    Resolved(Coordinate),
}

impl From<&str> for CoordinateInput {
    fn from(s: &str) -> Self {
        CoordinateInput::Text(s.to_string())
    }
}

impl From<String> for CoordinateInput {
    fn from(s: String) -> Self {
        CoordinateInput::Text(s)
    }
}

impl From<(f64, f64)> for CoordinateInput {
    fn from((ra, dec): (f64, f64)) -> Self {
        CoordinateInput::Pair(ra, dec)
    }
}

impl From<Coordinate> for CoordinateInput {
    fn from(c: Coordinate) -> Self {
        CoordinateInput::Resolved(c)
    }
}

/// Parse an explicit coordinate.
///
/// `units` defaults to degrees for numeric pairs; for strings it defaults to
/// hour-angle RA when the RA token is sexagesimal and degrees otherwise.
/// An already-resolved coordinate is rebuilt in its own frame, which checks
/// the declination, wraps RA and rotates Galactic values into ICRS.
pub fn parse_coordinate(
    input: &CoordinateInput,
    units: Option<CoordUnits>,
    frame: Frame,
) -> PlannerResult<Coordinate> {
    match input {
        CoordinateInput::Resolved(c) => Coordinate::in_frame(c.ra, c.dec, c.frame),
        CoordinateInput::Pair(ra, dec) => {
            let units = units.unwrap_or(CoordUnits::DEGREES);
            Coordinate::in_frame(units.ra.to_degrees(*ra), units.dec.to_degrees(*dec), frame)
        }
        CoordinateInput::Text(text) => parse_coordinate_str(text, units, frame),
    }
}

/// Parse a coordinate string such as `"148.152 70.1215"`,
/// `"09:55:52.7 +69:40:47"`, `"09 55 52.7 +69 40 47"` or
/// `"09h55m52.7s +69d40m47s"`.
pub fn parse_coordinate_str(
    text: &str,
    units: Option<CoordUnits>,
    frame: Frame,
) -> PlannerResult<Coordinate> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() < 2 || tokens.len() % 2 != 0 || tokens.len() > 6 {
        return Err(PlannerError::InvalidCoordinate(format!(
            "expected a right ascension and a declination in '{}'",
            text
        )));
    }

    let (ra_tokens, dec_tokens) = tokens.split_at(tokens.len() / 2);
    let ra = Component::parse(ra_tokens)?;
    let dec = Component::parse(dec_tokens)?;

    let ra_unit = ra.unit_hint.or(units.map(|u| u.ra)).unwrap_or(if ra.is_sexagesimal() {
        AngleUnit::HourAngle
    } else {
        AngleUnit::Degree
    });
    let dec_unit = dec
        .unit_hint
        .or(units.map(|u| u.dec))
        .unwrap_or(AngleUnit::Degree);

    Coordinate::in_frame(
        ra_unit.to_degrees(ra.value()),
        dec_unit.to_degrees(dec.value()),
        frame,
    )
}

/// One angle split into sexagesimal fields.
#[derive(Debug)]
struct Component {
    negative: bool,
    fields: Vec<f64>,
    unit_hint: Option<AngleUnit>,
}

impl Component {
    fn parse(tokens: &[&str]) -> PlannerResult<Self> {
        let mut unit_hint = None;
        let mut pieces: Vec<String> = Vec::new();

        for token in tokens {
            if token.contains(['h', 'H']) {
                unit_hint = Some(AngleUnit::HourAngle);
            } else if token.contains(['d', 'D', '°']) {
                unit_hint = Some(AngleUnit::Degree);
            }

            pieces.extend(
                token
                    .split(|c: char| {
                        matches!(c, ':' | 'h' | 'H' | 'd' | 'D' | 'm' | 'M' | 's' | 'S')
                            || matches!(c, '°' | '\'' | '"' | '′' | '″')
                    })
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
        }

        if pieces.is_empty() || pieces.len() > 3 {
            return Err(PlannerError::InvalidCoordinate(format!(
                "cannot interpret angle '{}'",
                tokens.join(" ")
            )));
        }

        // The sign lives on the leading field so "-00 30 00" stays negative.
        let negative = pieces[0].trim_start().starts_with('-');
        let mut fields = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.iter().enumerate() {
            let value: f64 = piece.trim().parse().map_err(|_| {
                PlannerError::InvalidCoordinate(format!("'{}' is not a number", piece))
            })?;
            if !value.is_finite() {
                return Err(PlannerError::InvalidCoordinate(format!(
                    "'{}' is not finite",
                    piece
                )));
            }
            if i > 0 && !(0.0..60.0).contains(&value) {
                return Err(PlannerError::InvalidCoordinate(format!(
                    "sexagesimal field '{}' outside [0, 60)",
                    piece
                )));
            }
            fields.push(value.abs());
        }

        Ok(Self {
            negative,
            fields,
            unit_hint,
        })
    }

    fn is_sexagesimal(&self) -> bool {
        self.fields.len() > 1 || self.unit_hint == Some(AngleUnit::HourAngle)
    }

    fn value(&self) -> f64 {
        let magnitude = self
            .fields
            .iter()
            .zip([1.0, 60.0, 3600.0])
            .map(|(v, div)| v / div)
            .sum::<f64>();
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}
