//! zypsel - a package selector TUI for zypp-style package pools
//!
//! This library exposes the core modules for use by the debug CLI and tests.

pub mod config;
pub mod history;
pub mod history_view;
pub mod logging;
pub mod model;
pub mod search;
pub mod strategy;
pub mod types;
