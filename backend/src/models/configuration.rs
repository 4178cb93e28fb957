//! Observing configurations and their attribute bag.
//!
//! A [`Configuration`] carries a small set of recognised instrument fields in
//! [`RecognizedAttributes`] and everything else in an insertion-ordered
//! [`AttributeBag`]. Recognised fields are filled only when the supplied value
//! is an angle; otherwise the value is kept verbatim in the bag.

use qtty::{Arcsecond, Arcseconds, Degrees};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PlannerError, PlannerResult};
use crate::models::{AngleUnit, Coordinate, Frame};
use crate::resolver::parser::parse_coordinate_str;
use crate::services::offset::Offset;

pub const SLIT_LENGTH: &str = "slit_length";
pub const SLIT_WIDTH: &str = "slit_width";
pub const FIBER_RADIUS: &str = "fiber_radius";
pub const POSITION_ANGLE: &str = "PA";
pub const OBSTYPE: &str = "obstype";
pub const COORDINATES: &str = "coordinates";
pub const NAME: &str = "name";

/// An angle together with the unit it was given in, e.g. `128 arcsec`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleValue {
    pub value: f64,
    pub unit: AngleUnit,
}

impl AngleValue {
    pub fn new(value: f64, unit: AngleUnit) -> Self {
        Self { value, unit }
    }

    pub fn arcsec(value: f64) -> Self {
        Self::new(value, AngleUnit::Arcsec)
    }

    pub fn arcmin(value: f64) -> Self {
        Self::new(value, AngleUnit::Arcmin)
    }

    pub fn deg(value: f64) -> Self {
        Self::new(value, AngleUnit::Degree)
    }

    pub fn to_degrees(&self) -> Degrees {
        self.unit.to_degrees(self.value)
    }

    pub fn to_arcseconds(&self) -> Arcseconds {
        match self.unit {
            AngleUnit::Arcsec => Arcseconds::new(self.value),
            _ => self.to_degrees().to::<Arcsecond>(),
        }
    }
}

impl fmt::Display for AngleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Accepts `"128 arcsec"`, `"1.5arcsec"`, `"60 deg"`, `"10 arcmin"`.
impl FromStr for AngleValue {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        if unit.trim().is_empty() {
            return Err(PlannerError::InvalidCoordinate(format!(
                "angle '{}' has no unit",
                s
            )));
        }
        let value: f64 = number.trim().parse().map_err(|_| {
            PlannerError::InvalidCoordinate(format!("'{}' is not an angle", s))
        })?;
        Ok(Self::new(value, unit.parse()?))
    }
}

/// Value of one configuration attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Angle(AngleValue),
    Coordinate(Coordinate),
    Text(String),
}

impl AttributeValue {
    /// The value as an angle, parsing text like `"1.5 arcsec"` when needed.
    pub fn as_angle(&self) -> Option<AngleValue> {
        match self {
            AttributeValue::Angle(a) => Some(*a),
            AttributeValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::Angle(v) => write!(f, "{}", v),
            AttributeValue::Coordinate(v) => write!(f, "{}", v.to_decimal_string()),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<AngleValue> for AttributeValue {
    fn from(v: AngleValue) -> Self {
        AttributeValue::Angle(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<Coordinate> for AttributeValue {
    fn from(v: Coordinate) -> Self {
        AttributeValue::Coordinate(v)
    }
}

/// Insertion-ordered key/value attributes.
///
/// Serialises as a JSON object whose key order follows insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    entries: Vec<(String, AttributeValue)>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position of a replaced key.
    pub fn insert(&mut self, key: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AttributeBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BagVisitor;

        impl<'de> Visitor<'de> for BagVisitor {
            type Value = AttributeBag;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of configuration attributes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut bag = AttributeBag::new();
                while let Some((key, value)) = access.next_entry::<String, AttributeValue>()? {
                    bag.insert(key, value);
                }
                Ok(bag)
            }
        }

        deserializer.deserialize_map(BagVisitor)
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        let mut bag = AttributeBag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

/// Recognised instrument fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slit_length: Option<Arcseconds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slit_width: Option<Arcseconds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_radius: Option<Arcseconds>,
    /// Position angle, east of north.
    #[serde(rename = "PA", skip_serializing_if = "Option::is_none")]
    pub position_angle: Option<Degrees>,
}

/// Complete slit group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlitGeometry {
    pub length: Arcseconds,
    pub width: Arcseconds,
    pub position_angle: Degrees,
}

impl RecognizedAttributes {
    pub fn is_recognized_key(key: &str) -> bool {
        matches!(key, SLIT_LENGTH | SLIT_WIDTH | FIBER_RADIUS | POSITION_ANGLE)
    }

    /// Try to absorb `key = value`. Returns `false` when the key is not
    /// recognised or the value is not an angle; the field is then cleared.
    fn absorb(&mut self, key: &str, value: &AttributeValue) -> bool {
        let angle = value.as_angle();

        match key {
            SLIT_LENGTH => {
                self.slit_length = angle.map(|a| a.to_arcseconds());
                self.slit_length.is_some()
            }
            SLIT_WIDTH => {
                self.slit_width = angle.map(|a| a.to_arcseconds());
                self.slit_width.is_some()
            }
            FIBER_RADIUS => {
                self.fiber_radius = angle.map(|a| a.to_arcseconds());
                self.fiber_radius.is_some()
            }
            POSITION_ANGLE => {
                self.position_angle = angle.map(|a| a.to_degrees());
                self.position_angle.is_some()
            }
            _ => false,
        }
    }

    fn clear(&mut self, key: &str) {
        match key {
            SLIT_LENGTH => self.slit_length = None,
            SLIT_WIDTH => self.slit_width = None,
            FIBER_RADIUS => self.fiber_radius = None,
            POSITION_ANGLE => self.position_angle = None,
            _ => {}
        }
    }

    /// Slit geometry when length, width and PA are all present.
    pub fn slit(&self) -> Option<SlitGeometry> {
        Some(SlitGeometry {
            length: self.slit_length?,
            width: self.slit_width?,
            position_angle: self.position_angle?,
        })
    }

    pub fn fiber(&self) -> Option<Arcseconds> {
        self.fiber_radius
    }

    /// Present fields as display values in a fixed column order.
    pub fn columns(&self) -> Vec<(&'static str, AttributeValue)> {
        let mut out = Vec::new();
        if let Some(v) = self.slit_length {
            out.push((SLIT_LENGTH, AngleValue::arcsec(v.value()).into()));
        }
        if let Some(v) = self.slit_width {
            out.push((SLIT_WIDTH, AngleValue::arcsec(v.value()).into()));
        }
        if let Some(v) = self.position_angle {
            out.push((POSITION_ANGLE, AngleValue::deg(v.value()).into()));
        }
        if let Some(v) = self.fiber_radius {
            out.push((FIBER_RADIUS, AngleValue::arcsec(v.value()).into()));
        }
        out
    }
}

/// Offset star attached to a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetStar {
    pub coordinate: Coordinate,
    /// Offset from the star to the configuration's coordinate.
    pub offset: Offset,
}

/// One way of observing a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstype: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinate>,
    #[serde(flatten)]
    pub recognized: RecognizedAttributes,
    #[serde(default, skip_serializing_if = "AttributeBag::is_empty")]
    pub extra: AttributeBag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_star: Option<OffsetStar>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            obstype: None,
            coordinates: None,
            recognized: RecognizedAttributes::default(),
            extra: AttributeBag::new(),
            offset_star: None,
        }
    }

    /// Set a single attribute in place.
    ///
    /// `obstype` and `coordinates` address the dedicated fields; recognised
    /// keys are stored in [`RecognizedAttributes`] when the value is an angle;
    /// anything else lands in the bag verbatim. `name` is handled by the
    /// owning target since it is the store key.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) -> PlannerResult<()> {
        match key {
            OBSTYPE => {
                self.obstype = Some(match value {
                    AttributeValue::Text(s) => s,
                    other => other.to_string(),
                });
            }
            COORDINATES => {
                self.coordinates = Some(match value {
                    AttributeValue::Coordinate(c) => c,
                    AttributeValue::Text(s) => parse_coordinate_str(&s, None, Frame::Icrs)?,
                    other => {
                        return Err(PlannerError::InvalidCoordinate(format!(
                            "'{}' is not a coordinate",
                            other
                        )))
                    }
                });
            }
            _ if RecognizedAttributes::is_recognized_key(key) => {
                if self.recognized.absorb(key, &value) {
                    self.extra.remove(key);
                } else {
                    self.recognized.clear(key);
                    self.extra.insert(key, value);
                }
            }
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// Current value of an attribute, recognised or not.
    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        match key {
            NAME => Some(AttributeValue::Text(self.name.clone())),
            OBSTYPE => self.obstype.clone().map(AttributeValue::Text),
            COORDINATES => self.coordinates.map(AttributeValue::Coordinate),
            _ => self
                .recognized
                .columns()
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v)
                .or_else(|| self.extra.get(key).cloned()),
        }
    }
}

/// Read-only tabular snapshot of a configuration store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationTable {
    /// Column names: fixed columns, recognised fields present in any row,
    /// then the union of extra keys in first-seen order.
    pub columns: Vec<String>,
    pub rows: Vec<Configuration>,
}

impl ConfigurationTable {
    pub fn from_rows(rows: Vec<Configuration>) -> Self {
        let mut columns: Vec<String> = [NAME, OBSTYPE, COORDINATES]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for key in [SLIT_LENGTH, SLIT_WIDTH, POSITION_ANGLE, FIBER_RADIUS] {
            if rows
                .iter()
                .any(|r| r.recognized.columns().iter().any(|(k, _)| *k == key))
            {
                columns.push(key.to_string());
            }
        }
        for row in &rows {
            for key in row.extra.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }
        if rows.iter().any(|r| r.offset_star.is_some()) {
            columns.extend(
                ["offset_star", "offset_ra", "offset_dec", "offset_separation"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, name: &str) -> Option<&Configuration> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Display text for one cell; `None` when the row has no such value.
    pub fn cell(&self, row: usize, column: &str) -> Option<String> {
        let config = self.rows.get(row)?;
        let offset = config.offset_star.as_ref();
        match column {
            "offset_star" => offset.map(|o| o.coordinate.to_decimal_string()),
            "offset_ra" => offset.map(|o| format!("{:.2}\"", o.offset.delta_ra.value())),
            "offset_dec" => offset.map(|o| format!("{:.2}\"", o.offset.delta_dec.value())),
            "offset_separation" => offset.map(|o| format!("{:.2}\"", o.offset.separation.value())),
            _ => config.attribute(column).map(|v| v.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_value_parsing() {
        let a: AngleValue = "128 arcsec".parse().unwrap();
        assert_eq!(a, AngleValue::arcsec(128.0));
        let a: AngleValue = "1.5arcsec".parse().unwrap();
        assert_eq!(a.value, 1.5);
        let a: AngleValue = "10 arcmin".parse().unwrap();
        assert!((a.to_arcseconds().value() - 600.0).abs() < 1e-9);
        assert!("12".parse::<AngleValue>().is_err());
        assert!("wide".parse::<AngleValue>().is_err());
    }

    #[test]
    fn test_recognized_keys_need_angles() {
        let mut config = Configuration::new("primary");
        config.set_attribute(SLIT_WIDTH, AngleValue::arcsec(1.5).into()).unwrap();
        config.set_attribute(SLIT_LENGTH, AttributeValue::Number(128.0)).unwrap();

        assert_eq!(config.recognized.slit_width, Some(Arcseconds::new(1.5)));
        assert!(config.recognized.slit_length.is_none());
        assert_eq!(config.extra.get(SLIT_LENGTH), Some(&AttributeValue::Number(128.0)));
        assert!(config.recognized.slit().is_none());
    }

    #[test]
    fn test_complete_slit_group() {
        let mut config = Configuration::new("primary");
        config.set_attribute(SLIT_LENGTH, AngleValue::arcmin(2.0).into()).unwrap();
        config.set_attribute(SLIT_WIDTH, "1.5 arcsec".into()).unwrap();
        config.set_attribute(POSITION_ANGLE, "60 deg".into()).unwrap();

        let slit = config.recognized.slit().unwrap();
        assert!((slit.length.value() - 120.0).abs() < 1e-9);
        assert!((slit.width.value() - 1.5).abs() < 1e-9);
        assert_eq!(slit.position_angle.value(), 60.0);
        assert!(config.extra.is_empty());
    }

    /// A unitless PA is not an angle and stays in the bag like any other key
    #[test]
    fn test_bare_number_position_angle_is_not_recognized() {
        let mut config = Configuration::new("primary");
        config.set_attribute(POSITION_ANGLE, AttributeValue::Integer(60)).unwrap();
        assert!(config.recognized.position_angle.is_none());
        assert_eq!(config.extra.get(POSITION_ANGLE), Some(&AttributeValue::Integer(60)));

        config.set_attribute(POSITION_ANGLE, AttributeValue::Number(-12.5)).unwrap();
        assert!(config.recognized.position_angle.is_none());

        config.set_attribute(POSITION_ANGLE, AngleValue::deg(-12.5).into()).unwrap();
        assert_eq!(config.recognized.position_angle, Some(Degrees::new(-12.5)));
        assert!(config.extra.get(POSITION_ANGLE).is_none());
    }

    #[test]
    fn test_editing_recognized_key_to_plain_value_moves_it_to_bag() {
        let mut config = Configuration::new("tertiary");
        config.set_attribute(FIBER_RADIUS, AngleValue::arcsec(30.0).into()).unwrap();
        assert!(config.recognized.fiber().is_some());

        config.set_attribute(FIBER_RADIUS, "large".into()).unwrap();
        assert!(config.recognized.fiber().is_none());
        assert_eq!(config.attribute(FIBER_RADIUS), Some("large".into()));
    }

    #[test]
    fn test_dedicated_fields() {
        let mut config = Configuration::new("c");
        config.set_attribute(OBSTYPE, "imaging".into()).unwrap();
        config.set_attribute(COORDINATES, "10.0 20.0".into()).unwrap();
        assert_eq!(config.obstype.as_deref(), Some("imaging"));
        assert_eq!(config.coordinates.map(|c| c.dec_deg()), Some(20.0));

        let err = config.set_attribute(COORDINATES, AttributeValue::Bool(true)).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_bag_preserves_insertion_order() {
        let mut bag = AttributeBag::new();
        bag.insert("grating", "600/4000".into());
        bag.insert("exptime", AttributeValue::Integer(900));
        bag.insert("filter", "g".into());
        bag.insert("grating", "1200/5000".into());

        let keys: Vec<_> = bag.keys().collect();
        assert_eq!(keys, vec!["grating", "exptime", "filter"]);

        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"{"grating":"1200/5000","exptime":900,"filter":"g"}"#);
    }

    #[test]
    fn test_attribute_value_deserialization() {
        let v: AttributeValue = serde_json::from_str("900").unwrap();
        assert_eq!(v, AttributeValue::Integer(900));
        let v: AttributeValue = serde_json::from_str("1.5").unwrap();
        assert_eq!(v, AttributeValue::Number(1.5));
        let v: AttributeValue = serde_json::from_str(r#"{"value": 1.5, "unit": "arcsec"}"#).unwrap();
        assert_eq!(v, AttributeValue::Angle(AngleValue::arcsec(1.5)));
        let v: AttributeValue = serde_json::from_str(r#""B""#).unwrap();
        assert_eq!(v, AttributeValue::Text("B".into()));
    }

    #[test]
    fn test_table_columns() {
        let mut a = Configuration::new("primary");
        a.set_attribute(SLIT_WIDTH, AngleValue::arcsec(1.5).into()).unwrap();
        a.set_attribute("grating", "600/4000".into()).unwrap();
        let mut b = Configuration::new("tertiary");
        b.set_attribute(FIBER_RADIUS, AngleValue::arcsec(30.0).into()).unwrap();
        b.set_attribute("exptime", AttributeValue::Integer(600)).unwrap();

        let table = ConfigurationTable::from_rows(vec![a, b]);
        assert_eq!(
            table.columns,
            vec!["name", "obstype", "coordinates", "slit_width", "fiber_radius", "grating", "exptime"]
        );
        assert_eq!(table.cell(0, "grating").as_deref(), Some("600/4000"));
        assert_eq!(table.cell(1, "grating"), None);
        assert_eq!(table.cell(1, "fiber_radius").as_deref(), Some("30 arcsec"));
    }
}
