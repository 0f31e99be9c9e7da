//! Scenario tests driving the bot end to end.
//!
//! These tests feed raw chat lines through [`crate::Bot::on_line`] against
//! the in-memory directory, sink and store, covering:
//! - Authorization tiers and fallback replies
//! - Tech, time, score and group commands
//! - WhiteStar events and the periodic status tick
//! - Persistence across restarts
//!
//! # Test Structure
//!
//! - `integration.rs`: end-to-end command scenarios
//! - `helpers.rs`: the standard roster and a harness around the bot

mod helpers;

// Re-export for convenience
pub use helpers::*;
