//! regstat: hierarchical regional statistics explorer
//!
//! Layers, leaves first:
//! - [`domain`]: region tree, yearly records, series reconciliation
//! - [`application`]: navigator and reconciliation services
//! - [`infrastructure`]: data source boundary, HTTP client, service container
//! - [`cli`]: argument parsing, command dispatch, terminal rendering

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
