//! Observation targets and their configuration stores.

use serde::{Deserialize, Serialize};

use crate::error::{Outcome, PlannerError, PlannerResult, StoreWarning};
use crate::models::configuration::{AttributeBag, AttributeValue, NAME};
use crate::models::{
    Configuration, ConfigurationTable, CoordUnits, Coordinate, Frame, OffsetStar,
};
use crate::resolver::parser::{parse_coordinate, CoordinateInput};
use crate::services::offset::compute_offset;

/// Arguments of [`Target::add_configuration`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguration {
    pub name: String,
    #[serde(default)]
    pub obstype: Option<String>,
    #[serde(default)]
    pub coordinates: Option<CoordinateInput>,
    #[serde(default)]
    pub units: Option<CoordUnits>,
    #[serde(default)]
    pub frame: Frame,
    /// Any other keys, recognised or not.
    #[serde(flatten)]
    pub attributes: AttributeBag,
}

impl NewConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn obstype(mut self, obstype: impl Into<String>) -> Self {
        self.obstype = Some(obstype.into());
        self
    }

    pub fn coordinates(mut self, coordinates: impl Into<CoordinateInput>) -> Self {
        self.coordinates = Some(coordinates.into());
        self
    }

    pub fn units(mut self, units: CoordUnits) -> Self {
        self.units = Some(units);
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key, value.into());
        self
    }
}

/// Which configurations an operation applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectorRepr", into = "SelectorRepr")]
pub enum ConfigSelector {
    #[default]
    All,
    One(String),
    Many(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    One(String),
    Many(Vec<String>),
}

impl From<SelectorRepr> for ConfigSelector {
    fn from(repr: SelectorRepr) -> Self {
        match repr {
            SelectorRepr::One(s) => ConfigSelector::from(s.as_str()),
            SelectorRepr::Many(names) => ConfigSelector::Many(names),
        }
    }
}

impl From<ConfigSelector> for SelectorRepr {
    fn from(selector: ConfigSelector) -> Self {
        match selector {
            ConfigSelector::All => SelectorRepr::One("all".to_string()),
            ConfigSelector::One(name) => SelectorRepr::One(name),
            ConfigSelector::Many(names) => SelectorRepr::Many(names),
        }
    }
}

/// Exactly `"all"` selects every configuration; any other string, including
/// `"ALL"`, names one.
impl From<&str> for ConfigSelector {
    fn from(s: &str) -> Self {
        if s == "all" {
            ConfigSelector::All
        } else {
            ConfigSelector::One(s.to_string())
        }
    }
}

impl From<Vec<String>> for ConfigSelector {
    fn from(names: Vec<String>) -> Self {
        ConfigSelector::Many(names)
    }
}

/// An astronomical target with its configuration store.
///
/// Configuration names are unique and kept in insertion order. A target
/// without a coordinate is valid; its configurations simply start without
/// one unless given explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    name: String,
    coordinate: Option<Coordinate>,
    configurations: Vec<Configuration>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinate: None,
            configurations: Vec::new(),
        }
    }

    pub fn with_coordinate(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
            ..Self::new(name)
        }
    }

    /// Target from explicit coordinates, parsed offline.
    pub fn from_input(
        name: impl Into<String>,
        coordinates: &CoordinateInput,
        units: Option<CoordUnits>,
        frame: Frame,
    ) -> PlannerResult<Self> {
        let coordinate = parse_coordinate(coordinates, units, frame)?;
        Ok(Self::with_coordinate(name, coordinate))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> Option<&Coordinate> {
        self.coordinate.as_ref()
    }

    /// Replace the target coordinate. Existing configurations keep theirs.
    pub fn set_coordinate(&mut self, coordinate: Option<Coordinate>) {
        self.coordinate = coordinate;
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.name == name)
    }

    pub fn configuration_names(&self) -> impl Iterator<Item = &str> {
        self.configurations.iter().map(|c| c.name.as_str())
    }

    fn position(&self, name: &str) -> PlannerResult<usize> {
        self.configurations
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| PlannerError::ConfigurationNotFound(name.to_string()))
    }

    /// Add a configuration, replacing any existing one of the same name.
    ///
    /// Without explicit coordinates the configuration takes a copy of the
    /// target coordinate as it is now. A replaced entry is reported as a
    /// [`StoreWarning::ConfigurationOverwritten`] and nothing of it survives.
    pub fn add_configuration(&mut self, spec: NewConfiguration) -> PlannerResult<Outcome<()>> {
        let coordinates = match &spec.coordinates {
            Some(input) => Some(parse_coordinate(input, spec.units, spec.frame)?),
            None => self.coordinate,
        };

        let mut config = Configuration::new(spec.name);
        config.obstype = spec.obstype;
        config.coordinates = coordinates;
        for (key, value) in spec.attributes.iter() {
            config.set_attribute(key, value.clone())?;
        }

        let mut outcome = Outcome::new(());
        match self.configurations.iter().position(|c| c.name == config.name) {
            Some(idx) => {
                outcome.warn(StoreWarning::ConfigurationOverwritten {
                    name: config.name.clone(),
                });
                self.configurations[idx] = config;
            }
            None => {
                log::debug!("Target {}: added configuration {}", self.name, config.name);
                self.configurations.push(config);
            }
        }
        Ok(outcome)
    }

    pub fn remove_configuration(&mut self, name: &str) -> PlannerResult<Configuration> {
        let idx = self.position(name)?;
        Ok(self.configurations.remove(idx))
    }

    /// Set one attribute of an existing configuration.
    ///
    /// Editing `name` renames the entry in place; renaming onto another
    /// existing configuration replaces it with a warning. Recognised groups
    /// are not re-validated after an edit.
    pub fn edit_configuration(
        &mut self,
        name: &str,
        attribute: &str,
        value: AttributeValue,
    ) -> PlannerResult<Outcome<()>> {
        let idx = self.position(name)?;
        let mut outcome = Outcome::new(());

        if attribute == NAME {
            let new_name = value.to_string();
            if new_name == name {
                return Ok(outcome);
            }
            if let Some(other) = self.configurations.iter().position(|c| c.name == new_name) {
                outcome.warn(StoreWarning::ConfigurationOverwritten {
                    name: new_name.clone(),
                });
                self.configurations.remove(other);
            }
            let idx = self.position(name)?;
            self.configurations[idx].name = new_name;
            return Ok(outcome);
        }

        self.configurations[idx].set_attribute(attribute, value)?;
        Ok(outcome)
    }

    /// Snapshot of the store. Changing the returned table has no effect on
    /// the target.
    pub fn list_configurations(&self) -> ConfigurationTable {
        ConfigurationTable::from_rows(self.configurations.clone())
    }

    fn select(&self, selector: &ConfigSelector) -> PlannerResult<Vec<usize>> {
        match selector {
            ConfigSelector::All => Ok((0..self.configurations.len()).collect()),
            ConfigSelector::One(name) => Ok(vec![self.position(name)?]),
            ConfigSelector::Many(names) => names.iter().map(|n| self.position(n)).collect(),
        }
    }

    /// Attach an offset star to the selected configurations.
    ///
    /// Each offset is computed from the star to the configuration's own
    /// coordinate. Configurations without a coordinate are skipped with a
    /// [`StoreWarning::MissingCoordinates`]. Unknown names fail the whole call
    /// before anything is changed. Returns the names that were annotated.
    pub fn add_offset_star(
        &mut self,
        coordinate: &CoordinateInput,
        units: Option<CoordUnits>,
        frame: Frame,
        selector: &ConfigSelector,
    ) -> PlannerResult<Outcome<Vec<String>>> {
        let star = parse_coordinate(coordinate, units, frame)?;
        let selected = self.select(selector)?;

        let mut outcome = Outcome::new(Vec::new());
        for idx in selected {
            let config = &mut self.configurations[idx];
            match config.coordinates {
                Some(target) => {
                    config.offset_star = Some(OffsetStar {
                        coordinate: star,
                        offset: compute_offset(&star, &target),
                    });
                    outcome.value.push(config.name.clone());
                }
                None => outcome.warn(StoreWarning::MissingCoordinates {
                    configuration: config.name.clone(),
                }),
            }
        }
        Ok(outcome)
    }
}
