//! Transition descriptors and hook sequencing.
//!
//! - [`Transition`] is what an input handler returns: stay, or move to a new
//!   instance of some kind (optionally initialized).
//! - [`plan`] turns a departing and an arriving kind into the ordered
//!   [`Step`]s the engine executes.

mod descriptor;
mod resolver;

pub use descriptor::{Target, Transition};
pub use resolver::{plan, plan_chains, shared_ancestor, Plan, Step};
