//! Macros for declaring hierarchy kinds.

/// Declare marker types for abstract kinds.
///
/// Abstract kinds carry no data: they only name a level of the hierarchy
/// that hooks and handlers can be registered on.
///
/// # Example
///
/// ```
/// use strata::abstract_kinds;
///
/// abstract_kinds! {
///     /// Every state of the heater.
///     pub struct HeaterState;
///     /// States where the heater is switched on.
///     pub struct Powered;
/// }
///
/// let _ = Powered;
/// ```
#[macro_export]
macro_rules! abstract_kinds {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis struct $name:ident;
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            $vis struct $name;
        )*
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Kind;

    abstract_kinds! {
        struct Root;
        /// documented
        struct Powered;
    }

    #[test]
    fn abstract_kinds_macro_declares_distinct_types() {
        assert_ne!(Kind::of::<Root>(), Kind::of::<Powered>());
        assert_eq!(Root, Root::default());
    }

    #[test]
    fn abstract_kinds_supports_visibility() {
        abstract_kinds! {
            pub struct PublicKind;
        }

        let _kind = PublicKind;
    }
}
