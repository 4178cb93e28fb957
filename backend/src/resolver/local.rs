//! In-memory name resolver.
//!
//! Serves a fixed name table, which makes it deterministic and suitable for
//! tests and offline sessions. Names match ignoring case and whitespace, so
//! `"M 82"`, `"m82"` and `"M82"` are the same entry.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::parser::parse_coordinate_str;
use super::NameResolver;
use crate::error::{PlannerError, PlannerResult};
use crate::models::{Coordinate, Frame};

#[derive(Debug, Clone, Default)]
pub struct LocalNameResolver {
    names: Arc<RwLock<HashMap<String, Coordinate>>>,
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl LocalNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `name -> "ra dec"` entries as found in the config file.
    pub fn from_table(table: &BTreeMap<String, String>) -> PlannerResult<Self> {
        let resolver = Self::new();
        for (name, coords) in table {
            let coordinate = parse_coordinate_str(coords, None, Frame::Icrs).map_err(|e| {
                PlannerError::Configuration(format!("resolver entry '{}': {}", name, e))
            })?;
            resolver.insert(name, coordinate);
        }
        Ok(resolver)
    }

    /// Add or replace an entry.
    pub fn insert(&self, name: &str, coordinate: Coordinate) {
        self.names.write().insert(normalize(name), coordinate);
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

#[async_trait]
impl NameResolver for LocalNameResolver {
    async fn lookup(&self, identifier: &str) -> PlannerResult<Coordinate> {
        self.names
            .read()
            .get(&normalize(identifier))
            .copied()
            .ok_or_else(|| PlannerError::NameNotResolved(identifier.to_string()))
    }

    fn service_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_ignores_case_and_spaces() {
        let resolver = LocalNameResolver::new();
        resolver.insert("M82", Coordinate::from_degrees(148.9685, 69.6797).unwrap());

        for name in ["M82", "m82", "M 82", " m 8 2 "] {
            assert!(resolver.lookup(name).await.is_ok(), "{}", name);
        }
        assert_eq!(
            resolver.lookup("M81").await.unwrap_err(),
            PlannerError::NameNotResolved("M81".into())
        );
    }

    #[test]
    fn test_from_table_rejects_bad_entries() {
        let mut table = BTreeMap::new();
        table.insert("M82".to_string(), "09:55:52.7 +69:40:47".to_string());
        let resolver = LocalNameResolver::from_table(&table).unwrap();
        assert_eq!(resolver.len(), 1);

        table.insert("broken".to_string(), "not a coordinate".to_string());
        assert!(matches!(
            LocalNameResolver::from_table(&table),
            Err(PlannerError::Configuration(_))
        ));
    }
}
