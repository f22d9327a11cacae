//! Persistence: wire documents, the codec and state upgrades.
//!
//! A document records the owner kind, the current state kind and every
//! blackboard entry that differs from its kind's baseline:
//!
//! ```json
//! {
//!   "$type": "heater",
//!   "state": "heating",
//!   "blackboard": {
//!     "heating": { "target": 21 },
//!     "settings": { "offset": 2 }
//!   }
//! }
//! ```
//!
//! States written by older versions are registered as outdated kinds and
//! upgraded through [`Outdated`] while restoring.

mod codec;
mod document;
mod upgrade;

pub use codec::{PersistenceCodec, Snapshot};
pub use document::Document;
pub use upgrade::{Outdated, UpgradeView};
