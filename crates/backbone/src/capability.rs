//! Capability keys - type-derived identity for topics and service slots.
//!
//! Both the event bus and the service registry index their tables by the
//! static type a caller names at the call site. A [`CapabilityKey`] is that
//! identity reduced to a copyable map key.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a message type or a service capability.
///
/// Two keys are equal iff they were derived from the same Rust type.
/// The type name is carried for diagnostics only and never takes part in
/// equality or hashing.
#[derive(Clone, Copy)]
pub struct CapabilityKey {
    id: TypeId,
    name: &'static str,
}

impl CapabilityKey {
    /// Derive the key for `T`. `T` may be a trait object (`dyn ScoreSystem`).
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name, as reported by the compiler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with the module path of the outer type stripped.
    ///
    /// `wordsort_shared::events::ScoreChanged` becomes `ScoreChanged`,
    /// `dyn wordsort_shared::services::ScoreSystem` becomes `ScoreSystem`.
    /// Only the first bound of a trait object is kept, so
    /// `dyn ScoreSystem + Send` is also `ScoreSystem`.
    /// Generic arguments are kept as-is.
    pub fn short_name(&self) -> &'static str {
        let end = first_bound_end(self.name);
        let base_end = self.name[..end].find('<').unwrap_or(end);
        let start = self.name[..base_end].rfind("::").map_or(0, |i| i + 2);
        &self.name[start..end]
    }
}

/// End of the first trait-object bound, ignoring ` + ` inside generic
/// arguments.
fn first_bound_end(name: &str) -> usize {
    let mut depth = 0usize;
    let mut prev = None;
    for (i, c) in name.char_indices() {
        match c {
            '<' => depth += 1,
            '>' if prev != Some('-') => depth = depth.saturating_sub(1),
            ' ' if depth == 0 && name[i..].starts_with(" + ") => return i,
            _ => {}
        }
        prev = Some(c);
    }
    name.len()
}

impl PartialEq for CapabilityKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityKey {}

impl Hash for CapabilityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityKey").field(&self.name).finish()
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct ScoreChanged;
    struct GameStateChanged;
    trait ScoreSystem {}

    #[test]
    fn same_type_yields_equal_keys() {
        assert_eq!(
            CapabilityKey::of::<ScoreChanged>(),
            CapabilityKey::of::<ScoreChanged>()
        );
    }

    #[test]
    fn distinct_types_yield_distinct_keys() {
        let keys: HashSet<_> = [
            CapabilityKey::of::<ScoreChanged>(),
            CapabilityKey::of::<GameStateChanged>(),
            CapabilityKey::of::<dyn ScoreSystem>(),
            CapabilityKey::of::<u32>(),
        ]
        .into_iter()
        .collect();

        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn short_name_strips_module_path() {
        assert_eq!(
            CapabilityKey::of::<ScoreChanged>().short_name(),
            "ScoreChanged"
        );
        assert_eq!(
            CapabilityKey::of::<dyn ScoreSystem>().short_name(),
            "ScoreSystem"
        );
        assert_eq!(CapabilityKey::of::<u32>().to_string(), "u32");
    }

    #[test]
    fn short_name_names_first_bound_of_trait_object() {
        let key = CapabilityKey::of::<dyn ScoreSystem + Send>();
        assert!(key.name().ends_with("Send"));
        assert_eq!(key.short_name(), "ScoreSystem");
        assert_eq!(key.to_string(), "ScoreSystem");

        let key = CapabilityKey::of::<dyn ScoreSystem + Send + Sync>();
        assert_eq!(key.short_name(), "ScoreSystem");
    }

    #[test]
    fn short_name_keeps_bounds_inside_generic_arguments() {
        let key = CapabilityKey::of::<Vec<Box<dyn ScoreSystem + Send>>>();
        assert!(key.short_name().starts_with("Vec<"));
        assert!(key.short_name().ends_with("Send>>"));
    }

    #[test]
    fn short_name_keeps_generic_arguments() {
        let key = CapabilityKey::of::<Vec<ScoreChanged>>();
        assert!(key.short_name().starts_with("Vec<"));
        assert!(key.short_name().ends_with("ScoreChanged>"));
    }
}
