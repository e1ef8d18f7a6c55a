// ABOUTME: Library module for postgres-silo-splitter
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod executor;
pub mod migration;
pub mod postgres;
pub mod regions;
pub mod registry;
pub mod report;
pub mod silo;
pub mod utils;
