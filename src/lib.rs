//! Species selection core for the occurrence-map quiz game
//!
//! Re-exports modules for use by the binary and the UI layers.

pub mod config;
pub mod evaluator;
pub mod fallback;
pub mod gbif;
pub mod search;
pub mod selector;
pub mod species;

pub use config::{GameConfig, GameMode};
pub use selector::{SelectError, SpeciesSelector};
pub use species::Species;
