//! Configuration model for treelock.
//!
//! `Config` represents an optional YAML file passed with `--config`.
//! Every field has a default, unknown fields are ignored, and command-line
//! flags override whatever the file sets.

mod model;
mod operations;
pub mod types;


pub use model::Config;
pub use types::{OutputFormat, UnknownLabelPolicy};
