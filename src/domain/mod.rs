//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod reconcile;

pub use arena::{Applied, FetchState, FetchTicket, RegionNode, RegionTree, Toggle, TreeRow};
pub use entities::*;
pub use error::DomainError;
pub use reconcile::{
    augment_cross_section, growth_rate, merge_sources, merge_year, reconcile_population,
    reconcile_series, reconcile_year, reconciled_cross_section, PopulationFigures,
    DEFAULT_HOUSEHOLD_SIZE,
};
