// ABOUTME: Command implementations for the silo splitter CLI
// ABOUTME: Exports the split command and its driver

pub mod split;

pub use split::{execute_split, split, SplitArgs, SplitOptions, SplitRun};
