//! Service layer: offsets, twilight, visibility and plans.
//!
//! Everything here is a pure computation over immutable inputs; the only
//! I/O in the crate lives in [`crate::resolver`].

pub mod astronomical_night;
pub mod observing_plan;
pub mod offset;
pub mod overlay;
pub mod starlist;
pub mod visibility_computer;

pub use astronomical_night::{
    compute_astronomical_nights, compute_dark_periods, twilight_times, TwilightLevel, TwilightTimes,
};
pub use observing_plan::{
    parse_night_date, NightlySummary, ObservingPlan, PlanVisibility, TargetSelector,
    TargetVisibility, VisibilityRequest,
};
pub use offset::{angular_separation, apply_tangent_offset, compute_offset, Offset};
pub use overlay::{aperture_overlays, finder_request, ApertureOverlay, FinderRequest};
pub use starlist::{render_starlist, StarlistFormat};
pub use visibility_computer::{
    compute_visibility, Airmass, NightContext, NightWindow, TimeSeries, VisibilityOptions,
    VisibilitySample, VisibilitySummary,
};
