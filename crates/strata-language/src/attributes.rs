use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::path::LanguagePath;

/// Attribute value; callers downcast via [`InputAttributes::get_as`].
pub type AttrValue = Arc<dyn Any + Send + Sync>;

struct AttrEntry {
    value: AttrValue,
    inheritable: bool,
}

/// Path-scoped key/value context attached to a token hierarchy for its
/// whole lifetime.
///
/// A value stored inheritable at a path is visible from every deeper
/// embedding of that path; a non-inheritable value only at the exact path
/// that set it. Absence is a plain `None`, never an error, and entries are
/// never invalidated automatically.
#[derive(Default)]
pub struct InputAttributes {
    table: RwLock<FxHashMap<LanguagePath, FxHashMap<Box<str>, AttrEntry>>>,
}

impl InputAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or overwrites) `value` under `(path, key)`.
    pub fn set_value(
        &self,
        path: &LanguagePath,
        key: impl Into<Box<str>>,
        value: AttrValue,
        inheritable: bool,
    ) {
        self.table
            .write()
            .entry(path.clone())
            .or_default()
            .insert(key.into(), AttrEntry { value, inheritable });
    }

    /// Resolves `key` at `path`: the exact entry first, else the nearest
    /// ancestor entry that was stored inheritable.
    pub fn get_value(&self, path: &LanguagePath, key: &str) -> Option<AttrValue> {
        let table = self.table.read();

        if let Some(entry) = table.get(path).and_then(|entries| entries.get(key)) {
            return Some(entry.value.clone());
        }

        for depth in (1..path.len()).rev() {
            let prefix = path.sub_path_range(0, depth);
            if let Some(entry) = table.get(&prefix).and_then(|entries| entries.get(key))
                && entry.inheritable
            {
                return Some(entry.value.clone());
            }
        }
        None
    }

    /// Typed [`get_value`](Self::get_value); `None` also on a type mismatch.
    pub fn get_as<T: Any + Send + Sync>(&self, path: &LanguagePath, key: &str) -> Option<Arc<T>> {
        self.get_value(path, key).and_then(|value| value.downcast::<T>().ok())
    }
}
