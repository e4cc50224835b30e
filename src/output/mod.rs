//! Output routing: rich (colored), plain, JSON or quiet, picked once from CLI flags.

pub mod context;

pub use context::{OutputContext, OutputMode};
