//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `RegionSource` boundary trait
//! but are themselves concrete structs, not traits.

mod navigator;
mod reconciliation;

pub use navigator::{ExpandOutcome, NavigatorService, RootLoad, Selection, TreeSnapshot};
pub use reconciliation::{ReconciliationService, SeriesOutcome, SubdistrictView, FALLBACK_YEAR};
