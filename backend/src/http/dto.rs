//! Data Transfer Objects for the HTTP API.
//!
//! Most responses reuse the model and service types directly since they
//! already derive Serialize; the request bodies live here.

use serde::{Deserialize, Serialize};

use crate::models::{
    AttributeValue, ConfigSelector, CoordUnits, Coordinate, Frame, ObservingSite, SiteRequest,
    Target,
};
use crate::resolver::CoordinateInput;
use crate::services::observing_plan::TargetSelector;
use crate::services::starlist::StarlistFormat;

// Re-export types that are returned as-is
pub use crate::error::Outcome;
pub use crate::models::{Configuration, ConfigurationTable};
pub use crate::resolver::ResolveRequest;
pub use crate::services::observing_plan::{NightlySummary, PlanVisibility};
pub use crate::services::overlay::FinderRequest;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Active name resolver
    pub resolver: String,
    /// Targets in the session catalog
    pub targets: usize,
}

/// One row of the target list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfoDto {
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub configurations: usize,
}

impl From<&Target> for TargetInfoDto {
    fn from(target: &Target) -> Self {
        Self {
            name: target.name().to_string(),
            coordinate: target.coordinate().copied(),
            configurations: target.configurations().len(),
        }
    }
}

/// Target list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetListResponse {
    pub targets: Vec<TargetInfoDto>,
    pub total: usize,
}

/// Response for target creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTargetResponse {
    pub target: Target,
    /// Whether a target of the same name was replaced
    pub replaced: bool,
}

/// Request body for editing one configuration attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditConfigurationRequest {
    pub attribute: String,
    pub value: AttributeValue,
}

/// Request body for attaching an offset star.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetStarRequest {
    pub coordinates: CoordinateInput,
    #[serde(default)]
    pub units: Option<CoordUnits>,
    #[serde(default)]
    pub frame: Frame,
    #[serde(default)]
    pub configurations: ConfigSelector,
}

/// Query parameters for the overlay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayQuery {
    /// Finder field of view in arcminutes (default: 5)
    #[serde(default = "default_field_size_arcmin")]
    pub field_size_arcmin: f64,
}

fn default_field_size_arcmin() -> f64 {
    5.0
}

/// Site list response.
#[derive(Debug, Clone, Serialize)]
pub struct SiteListResponse {
    pub sites: Vec<ObservingSite>,
    pub total: usize,
}

/// Request body for a visibility query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequestDto {
    /// Site name or explicit geodetic values
    pub site: SiteRequest,
    /// Night to compute, `YYYY-MM-DD`
    pub date: String,
    /// Plan nights; defaults to just `date`
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub targets: TargetSelector,
    /// Half-width in hours around local midnight
    #[serde(default)]
    pub view_range: Option<f64>,
    #[serde(default)]
    pub time_resolution_minutes: Option<u32>,
}

/// Request body for nightly summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequestDto {
    pub site: SiteRequest,
    pub dates: Vec<String>,
    #[serde(default)]
    pub targets: TargetSelector,
}

/// Request body for a target list export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StarlistRequestDto {
    #[serde(default)]
    pub targets: TargetSelector,
    #[serde(default)]
    pub format: StarlistFormat,
}
