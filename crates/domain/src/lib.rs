//! # skyshed-domain
//!
//! Pure domain model for the skyshed observatory automation system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **automation state machine** vocabulary ([`state::AutomationState`])
//! - Define **startup arguments** and their derived shutdown times
//! - Define the **weather safety** tri-state ([`weather::SafetyStatus`])
//! - Define **events** (progress records and operation outcomes)
//! - Define **pointing targets** and the azimuth math used by dome slaving
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod azimuth;
pub mod error;
pub mod event;
pub mod id;
pub mod startup;
pub mod state;
pub mod target;
pub mod time;
pub mod weather;
