//! REST API over an in-memory session catalog.
//!
//! Handlers are thin: they take the catalog lock, call into [`crate::models`]
//! or [`crate::services`], and return the result as JSON. Non-fatal warnings
//! travel in the response body next to the value; planner errors map to
//! status codes in [`error`]. Visibility work runs on the blocking pool.
//!
//! | Route                                        | Purpose                    |
//! |----------------------------------------------|----------------------------|
//! | `/v1/targets`                                | list, create by name/coord |
//! | `/v1/targets/{name}/configurations`          | configuration store        |
//! | `/v1/targets/{name}/offset-star`             | blind-offset annotation    |
//! | `/v1/visibility`, `/v1/visibility/summary`   | night visibility           |
//! | `/v1/starlist`                               | telescope target list      |

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub use router::create_router;

#[cfg(feature = "http-server")]
pub use state::AppState;
