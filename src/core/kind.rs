//! Kind identity.
//!
//! A kind is any `'static` Rust type taking part in the state hierarchy or
//! stored on the blackboard. Kinds are compared by `TypeId`; the type name is
//! kept only for diagnostics.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Copyable key identifying a state, data, input or output type.
///
/// # Example
///
/// ```rust
/// use strata::core::Kind;
///
/// struct Idle;
/// struct Heating;
///
/// assert_eq!(Kind::of::<Idle>(), Kind::of::<Idle>());
/// assert_ne!(Kind::of::<Idle>(), Kind::of::<Heating>());
/// assert_eq!(Kind::of::<Idle>().short_name(), "Idle");
/// ```
#[derive(Clone, Copy)]
pub struct Kind {
    id: TypeId,
    name: &'static str,
}

impl Kind {
    /// Kind of the static type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (generic arguments are kept).
    pub fn short_name(&self) -> &'static str {
        let head = self.name.split('<').next().unwrap_or(self.name);
        match head.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kind {}

impl Hash for Kind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.short_name())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
