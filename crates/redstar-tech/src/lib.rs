//! # RedStar Tech
//!
//! Tech bookkeeping and scoring for a strategy-game community bot.
//!
//! Every player owns a vector of upgrade levels, one slot per tech in the
//! [`TechCatalog`]. This crate provides:
//!
//! - **Catalog**: tech identifiers, display names, aliases and the contiguous
//!   category ranges (ships, trade, mining, weapon, shield, support)
//! - **Derived values**: `totalcargo` and `relics`, computed from other levels
//! - **Player store**: per-player levels and info fields with dirty tracking and
//!   snapshot remapping when the catalog evolves
//! - **Weights and scoring**: named weight tables and the capped scoring schemes
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use redstar_tech::{PlayerStore, ScoringEngine, TechCatalog, WeightSet};
//!
//! let catalog = Arc::new(TechCatalog::standard());
//! let mut players = PlayerStore::new(Arc::clone(&catalog));
//! players.tech_set("1001", "bs", 4);
//!
//! let weights = WeightSet::from_json_str(r#"{"weights": {"base": {"battleship": [1, 2, 5, 9]}}}"#)
//!     .unwrap();
//! let engine = ScoringEngine::new(catalog, weights);
//!
//! let player = players.get("1001").unwrap();
//! let outcome = engine.score(player, "base", false).unwrap();
//! assert_eq!(outcome.total, 9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod derived;
pub mod player;
pub mod scoring;
pub mod weights;

// Re-exports for convenience
pub use catalog::{Category, CatalogError, TechCatalog, TechDefinition, TechId, TechRef};
pub use derived::DerivedTech;
pub use player::{derived_level, LoadReport, Player, PlayerSnapshot, PlayerStore, SnapshotError};
pub use scoring::{Breakdown, BreakdownEntry, ScoreOutcome, Scheme, ScoringEngine, DEFAULT_TABLE};
pub use weights::{WeightError, WeightSet, WeightTable};
