//! # Type Identity
//!
//! Every participating type names itself with a stable dotted identifier
//! (`"app.models.User"`) and optionally names its parent type. The lineage
//! registry stores those parent links so class-level events can walk from a
//! derived type up through its ancestors without any runtime reflection.
//!
//! Lineage entries come from three places:
//!
//! - `inventory` submissions (emitted by `#[derive(Identifiable)]`)
//! - explicit [`register_lineage`] calls
//! - constructor registrations in a [`Factory`](crate::Factory)

use parking_lot::RwLock;
use std::{
    any::Any,
    collections::{HashMap, HashSet},
    sync::{Arc, LazyLock},
};

/// Upcasting helpers, implemented for every sized `'static` type.
pub trait AsAny: Any + Send + Sync {
    /// View as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// View as `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert a shared pointer into an `Arc<dyn Any>` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type that knows its own dotted name and the name of its parent type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Identifiable`",
    label = "missing `Identifiable` implementation",
    note = "Derive it with `#[derive(Identifiable)]` and `#[jii(name = \"...\")]`."
)]
pub trait Identifiable: AsAny {
    /// The dotted type name of this instance.
    fn type_name(&self) -> &'static str;

    /// The dotted type name of the parent type, if any.
    fn parent_type_name(&self) -> Option<&'static str> {
        None
    }
}

/// Static counterpart of [`Identifiable`], available without an instance.
pub trait TypeInfo: Identifiable + Sized {
    /// The dotted type name.
    const TYPE_NAME: &'static str;

    /// The dotted name of the parent type.
    const PARENT_TYPE_NAME: Option<&'static str> = None;
}

/// A parent link submitted to the distributed lineage collection.
#[derive(Debug, Clone, Copy)]
pub struct Lineage {
    /// The type name.
    pub type_name: &'static str,
    /// Its parent type name.
    pub parent: Option<&'static str>,
}

impl Lineage {
    /// Create a lineage entry. Usable in `inventory::submit!`.
    pub const fn new(type_name: &'static str, parent: Option<&'static str>) -> Self {
        Self { type_name, parent }
    }
}

inventory::collect!(Lineage);

static LINEAGE: LazyLock<RwLock<HashMap<String, Option<String>>>> = LazyLock::new(|| {
    let map = inventory::iter::<Lineage>
        .into_iter()
        .map(|entry| {
            (
                entry.type_name.to_string(),
                entry.parent.map(str::to_string),
            )
        })
        .collect();
    RwLock::new(map)
});

/// Record that `type_name` derives from `parent`.
///
/// A later registration for the same name replaces the earlier one.
pub fn register_lineage(type_name: &str, parent: Option<&str>) {
    LINEAGE
        .write()
        .insert(type_name.to_string(), parent.map(str::to_string));
}

/// Record a lineage link if the registry has not seen `type_name` yet.
pub fn ensure_lineage(type_name: &str, parent: Option<&str>) {
    if LINEAGE.read().contains_key(type_name) {
        return;
    }
    register_lineage(type_name, parent);
}

/// Whether the registry knows `type_name`.
pub fn is_registered(type_name: &str) -> bool {
    LINEAGE.read().contains_key(type_name)
}

/// The registered parent of `type_name`.
pub fn parent_of(type_name: &str) -> Option<String> {
    LINEAGE.read().get(type_name).cloned().flatten()
}

/// `type_name` followed by all of its registered ancestors, most derived first.
pub fn ancestors(type_name: &str) -> Vec<String> {
    let lineage = LINEAGE.read();
    let mut chain = vec![type_name.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([type_name]);
    let mut current = type_name;

    while let Some(Some(parent)) = lineage.get(current) {
        if !seen.insert(parent.as_str()) {
            tracing::warn!(type_name, parent = %parent, "type lineage contains a cycle");
            break;
        }
        chain.push(parent.clone());
        current = parent.as_str();
    }
    chain
}

/// Whether `type_name` is `ancestor` or derives from it.
pub fn is_a(type_name: &str, ancestor: &str) -> bool {
    ancestors(type_name).iter().any(|name| name == ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_parent_links() {
        register_lineage("identity.test.Base", None);
        register_lineage("identity.test.Middle", Some("identity.test.Base"));
        register_lineage("identity.test.Leaf", Some("identity.test.Middle"));

        assert_eq!(
            ancestors("identity.test.Leaf"),
            vec![
                "identity.test.Leaf",
                "identity.test.Middle",
                "identity.test.Base"
            ]
        );
        assert!(is_a("identity.test.Leaf", "identity.test.Base"));
        assert!(!is_a("identity.test.Base", "identity.test.Leaf"));
    }

    #[test]
    fn unknown_type_is_its_own_chain() {
        assert_eq!(ancestors("identity.test.Nobody"), vec!["identity.test.Nobody"]);
        assert_eq!(parent_of("identity.test.Nobody"), None);
    }

    #[test]
    fn cycles_terminate() {
        register_lineage("identity.test.CycleA", Some("identity.test.CycleB"));
        register_lineage("identity.test.CycleB", Some("identity.test.CycleA"));

        assert_eq!(
            ancestors("identity.test.CycleA"),
            vec!["identity.test.CycleA", "identity.test.CycleB"]
        );
    }
}
