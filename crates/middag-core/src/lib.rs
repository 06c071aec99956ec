//! Core planning pipeline for middag: four stages that turn a user query
//! and a list of on-hand ingredients into a one-store weekly dinner plan
//! built around grocery price drops.
//!
//! The pipeline threads a single [`state::PlanningState`] through
//! discovery, assignment, sourcing and consolidation. Every stage calls a
//! text-generation collaborator ([`generate::TextGenerator`]), defensively
//! parses its reply, and degrades to a partial result instead of failing
//! the request.

pub mod catalog;
pub mod generate;
pub mod pipeline;
pub mod pricing;
pub mod sanitize;
pub mod stage;
pub mod state;
pub mod validate;
