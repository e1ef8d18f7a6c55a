// ABOUTME: PostgreSQL client helpers
// ABOUTME: Re-exports connection functions used by the mapping store

pub mod connection;

pub use connection::{connect, connect_with_retry, DEFAULT_SOURCE_URL};
