//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the model
//! and service layer. The catalog lock is never held across an await.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Duration;
use qtty::Arcminutes;

use super::dto::{
    CreateTargetResponse, EditConfigurationRequest, HealthResponse, OffsetStarRequest,
    OverlayQuery, SiteListResponse, StarlistRequestDto, SummaryRequestDto, TargetInfoDto,
    TargetListResponse, VisibilityRequestDto,
};
use super::error::AppError;
use super::state::AppState;
use crate::error::{Outcome, PlannerError, PlannerResult};
use crate::models::{Configuration, ConfigurationTable, NewConfiguration, Target};
use crate::resolver::ResolveRequest;
use crate::services::observing_plan::{
    parse_night_date, NightlySummary, ObservingPlan, PlanVisibility, TargetSelector,
    VisibilityRequest,
};
use crate::services::overlay::{finder_request, FinderRequest};
use crate::services::starlist::render_starlist;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Owned copies of the selected catalog targets.
fn snapshot_targets(state: &AppState, selector: &TargetSelector) -> PlannerResult<Vec<Target>> {
    let catalog = state.catalog.read();
    match selector {
        TargetSelector::All => Ok(catalog.targets().to_vec()),
        TargetSelector::Named(names) => names
            .iter()
            .map(|name| catalog.get(name).cloned())
            .collect(),
    }
}

fn parse_dates(dates: &[String]) -> PlannerResult<Vec<chrono::NaiveDate>> {
    dates.iter().map(|d| parse_night_date(d)).collect()
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        resolver: state.resolver.service_name().to_string(),
        targets: state.catalog.read().len(),
    }))
}

// =============================================================================
// Targets
// =============================================================================

/// GET /v1/targets
pub async fn list_targets(State(state): State<AppState>) -> HandlerResult<TargetListResponse> {
    let targets: Vec<TargetInfoDto> = state
        .catalog
        .read()
        .targets()
        .iter()
        .map(TargetInfoDto::from)
        .collect();
    let total = targets.len();

    Ok(Json(TargetListResponse { targets, total }))
}

/// POST /v1/targets
///
/// Resolve the request into a target and store it, replacing any target of
/// the same name.
pub async fn create_target(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<(StatusCode, Json<CreateTargetResponse>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("target name must not be empty".to_string()));
    }

    let target = state.resolver.resolve_target(&request).await?;
    let replaced = state.catalog.write().insert(target.clone()).is_some();
    if replaced {
        log::info!("Replaced target {}", target.name());
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateTargetResponse { target, replaced }),
    ))
}

/// GET /v1/targets/{name}
pub async fn get_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<Target> {
    let target = state.catalog.read().get(&name)?.clone();
    Ok(Json(target))
}

/// DELETE /v1/targets/{name}
pub async fn delete_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<Target> {
    let removed = state.catalog.write().remove(&name)?;
    Ok(Json(removed))
}

// =============================================================================
// Configurations
// =============================================================================

/// GET /v1/targets/{name}/configurations
pub async fn list_configurations(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<ConfigurationTable> {
    let table = state.catalog.read().get(&name)?.list_configurations();
    Ok(Json(table))
}

/// POST /v1/targets/{name}/configurations
///
/// Overwriting an existing configuration succeeds and reports a warning.
pub async fn add_configuration(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(spec): Json<NewConfiguration>,
) -> Result<(StatusCode, Json<Outcome<Configuration>>), AppError> {
    let config_name = spec.name.clone();
    let mut catalog = state.catalog.write();
    let target = catalog.get_mut(&name)?;

    let outcome = target.add_configuration(spec)?;
    let stored = target
        .configuration(&config_name)
        .cloned()
        .ok_or(PlannerError::ConfigurationNotFound(config_name))?;

    Ok((StatusCode::CREATED, Json(outcome.map(|_| stored))))
}

/// PATCH /v1/targets/{name}/configurations/{config}
pub async fn edit_configuration(
    State(state): State<AppState>,
    Path((name, config)): Path<(String, String)>,
    Json(edit): Json<EditConfigurationRequest>,
) -> HandlerResult<Outcome<ConfigurationTable>> {
    let mut catalog = state.catalog.write();
    let target = catalog.get_mut(&name)?;
    let outcome = target.edit_configuration(&config, &edit.attribute, edit.value)?;
    Ok(Json(outcome.map(|_| target.list_configurations())))
}

/// DELETE /v1/targets/{name}/configurations/{config}
pub async fn delete_configuration(
    State(state): State<AppState>,
    Path((name, config)): Path<(String, String)>,
) -> HandlerResult<Configuration> {
    let removed = state
        .catalog
        .write()
        .get_mut(&name)?
        .remove_configuration(&config)?;
    Ok(Json(removed))
}

/// GET /v1/targets/{name}/configurations/{config}/overlays
///
/// Finder-chart centre and aperture outlines for one configuration.
pub async fn get_overlays(
    State(state): State<AppState>,
    Path((name, config)): Path<(String, String)>,
    Query(query): Query<OverlayQuery>,
) -> HandlerResult<FinderRequest> {
    if !(query.field_size_arcmin.is_finite() && query.field_size_arcmin > 0.0) {
        return Err(AppError::BadRequest(
            "field_size_arcmin must be a positive number".to_string(),
        ));
    }

    let catalog = state.catalog.read();
    let configuration = catalog
        .get(&name)?
        .configuration(&config)
        .ok_or_else(|| PlannerError::ConfigurationNotFound(config.clone()))?;

    let request = finder_request(configuration, Arcminutes::new(query.field_size_arcmin))
        .ok_or_else(|| {
            AppError::BadRequest(format!("configuration '{}' has no coordinates", config))
        })?;
    Ok(Json(request))
}

/// POST /v1/targets/{name}/offset-star
///
/// Returns the names of the configurations that received the offset.
pub async fn add_offset_star(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<OffsetStarRequest>,
) -> HandlerResult<Outcome<Vec<String>>> {
    let mut catalog = state.catalog.write();
    let outcome = catalog.get_mut(&name)?.add_offset_star(
        &request.coordinates,
        request.units,
        request.frame,
        &request.configurations,
    )?;
    Ok(Json(outcome))
}

// =============================================================================
// Sites
// =============================================================================

/// GET /v1/sites
pub async fn list_sites(State(state): State<AppState>) -> HandlerResult<SiteListResponse> {
    let sites: Vec<_> = state.sites.sites().cloned().collect();
    let total = sites.len();
    Ok(Json(SiteListResponse { sites, total }))
}

// =============================================================================
// Plans
// =============================================================================

/// POST /v1/visibility
///
/// Visibility of catalog targets for one night. The plan covers `dates`
/// (or just `date`), so asking for a night outside it fails.
pub async fn compute_visibility(
    State(state): State<AppState>,
    Json(request): Json<VisibilityRequestDto>,
) -> HandlerResult<Outcome<PlanVisibility>> {
    let site = request.site.resolve(&state.sites)?;
    let date = parse_night_date(&request.date)?;
    let mut dates = parse_dates(&request.dates)?;
    if dates.is_empty() {
        dates.push(date);
    }

    let targets = snapshot_targets(&state, &TargetSelector::All)?;
    let settings = state.visibility.clone();
    let query = VisibilityRequest {
        targets: request.targets,
        view_range: request.view_range,
        time_resolution: request
            .time_resolution_minutes
            .map(|m| Duration::minutes(i64::from(m))),
    };

    // Use spawn_blocking for the CPU-bound sampling
    let outcome = tokio::task::spawn_blocking(move || {
        ObservingPlan::new(&targets, site, dates)?
            .with_settings(&settings)
            .plot_visibility(date, &query)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(outcome))
}

/// POST /v1/visibility/summary
pub async fn nightly_summaries(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequestDto>,
) -> HandlerResult<Outcome<Vec<NightlySummary>>> {
    let site = request.site.resolve(&state.sites)?;
    let dates = parse_dates(&request.dates)?;
    let targets = snapshot_targets(&state, &request.targets)?;
    let settings = state.visibility.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        ObservingPlan::new(&targets, site, dates)
            .map(|plan| plan.with_settings(&settings).nightly_summaries())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(outcome))
}

/// POST /v1/starlist
///
/// Plain-text target list for the selected targets.
pub async fn export_starlist(
    State(state): State<AppState>,
    Json(request): Json<StarlistRequestDto>,
) -> Result<String, AppError> {
    let targets = snapshot_targets(&state, &request.targets)?;
    Ok(render_starlist(&targets, request.format))
}
