//! # Observing Suite
//!
//! Planning support for astronomical observing runs.
//!
//! The crate keeps a catalog of observation targets, each with its own store
//! of named instrument configurations, derives blind-offset vectors from
//! guide stars, and computes how observable each target is over a night from
//! a given site.
//!
//! ## Features
//!
//! - **Coordinates**: Parse decimal, sexagesimal and letter-delimited
//!   positions; resolve names through CDS Sesame or a local table
//! - **Configurations**: Named setups per target with typed attributes and a
//!   recognised subset (slit geometry, fiber radius, position angle)
//! - **Offsets**: Great-circle separation and signed ΔRA/ΔDec for blind offsets
//! - **Visibility**: Altitude, airmass, Moon and twilight across a night
//! - **Plans**: Targets + site + nights, with per-night queries and Keck or
//!   Palomar target-list export
//! - **HTTP API**: RESTful endpoints over an in-memory session catalog
//!
//! ## Architecture
//!
//! - [`models`]: Coordinates, sites, configurations, targets, time handling
//! - [`resolver`]: Offline coordinate parsing and name resolution backends
//! - [`services`]: Ephemerides, offsets, twilight, visibility and plans
//! - [`config`]: `observing.toml` loading
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ## Example
//!
//! ```
//! use observing_suite::models::{AngleValue, Coordinate, NewConfiguration, Target};
//!
//! let m82 = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
//! let mut target = Target::with_coordinate("M82", m82);
//! let outcome = target
//!     .add_configuration(
//!         NewConfiguration::new("primary")
//!             .obstype("spectroscopy")
//!             .with("slit_length", AngleValue::arcsec(128.0))
//!             .with("slit_width", AngleValue::arcsec(1.5))
//!             .with("PA", AngleValue::deg(60.0)),
//!     )
//!     .unwrap();
//! assert!(outcome.warnings.is_empty());
//! assert_eq!(target.list_configurations().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::PlannerConfig;
pub use error::{Outcome, PlannerError, PlannerResult, StoreWarning};
