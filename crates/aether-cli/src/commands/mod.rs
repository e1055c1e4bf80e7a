//! Subcommand implementations.

pub mod convert;
pub mod crawl;
pub mod fetch;
pub mod search;
