//! # Path Aliases
//!
//! `@name` tokens standing for paths or URLs. An alias may carry a path
//! suffix (`@app/views/site`), in which case the most specific registered
//! prefix wins. Only `/` separates alias segments, so `@foo/barbar` never
//! matches a registered `@foo/bar`.
//!
//! Entries are grouped by root alias (the part before the first `/`). A root
//! with a single plain entry holds just a path. A root that also has more
//! specific sub-aliases holds a list sorted so that longer keys come first.

use crate::error::ConfigError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::LazyLock;

#[derive(Debug, Clone)]
enum Entry {
    Path(String),
    Nested(Vec<(String, String)>),
}

/// A table of `@alias` → path mappings.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    roots: IndexMap<String, Entry>,
}

fn normalize_name(alias: &str) -> String {
    if alias.starts_with('@') {
        alias.to_string()
    } else {
        format!("@{alias}")
    }
}

fn root_of(alias: &str) -> (&str, bool) {
    match alias.find('/') {
        Some(pos) => (&alias[..pos], true),
        None => (alias, false),
    }
}

/// Whether `name` is `alias` or a `/`-bounded prefix of it.
fn covers(name: &str, alias: &str) -> bool {
    alias
        .strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn sort_nested(entries: &mut [(String, String)]) {
    entries.sort_by(|(a, _), (b, _)| b.cmp(a));
}

impl AliasTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` for `path`, or remove it when `path` is `None`.
    ///
    /// The leading `@` is optional. A path that is itself an alias is
    /// resolved first; trailing `/` and `\` are trimmed otherwise.
    pub fn set(&mut self, alias: &str, path: Option<&str>) -> Result<(), ConfigError> {
        let alias = normalize_name(alias);
        let (root, nested) = root_of(&alias);
        let root = root.to_string();

        let Some(path) = path else {
            self.remove(&alias, &root, nested);
            return Ok(());
        };

        let path = if path.starts_with('@') {
            self.resolve(path)?
        } else {
            path.trim_end_matches(['/', '\\']).to_string()
        };

        match self.roots.get_mut(&root) {
            None => {
                let entry = if nested {
                    Entry::Nested(vec![(alias, path)])
                } else {
                    Entry::Path(path)
                };
                self.roots.insert(root, entry);
            }
            Some(Entry::Path(existing)) => {
                if nested {
                    let mut entries = vec![(alias, path), (root.clone(), existing.clone())];
                    sort_nested(&mut entries);
                    self.roots.insert(root, Entry::Nested(entries));
                } else {
                    *existing = path;
                }
            }
            Some(Entry::Nested(entries)) => {
                match entries.iter_mut().find(|(name, _)| *name == alias) {
                    Some((_, existing)) => *existing = path,
                    None => entries.push((alias, path)),
                }
                sort_nested(entries);
            }
        }
        Ok(())
    }

    fn remove(&mut self, alias: &str, root: &str, nested: bool) {
        match self.roots.get_mut(root) {
            Some(Entry::Nested(entries)) => {
                entries.retain(|(name, _)| name != alias);
                if entries.is_empty() {
                    self.roots.shift_remove(root);
                }
            }
            Some(Entry::Path(_)) if !nested => {
                self.roots.shift_remove(root);
            }
            _ => {}
        }
    }

    /// Translate an alias into a path.
    ///
    /// Strings not starting with `@` are returned unchanged. Returns `None`
    /// if no registered alias covers `alias`.
    pub fn get(&self, alias: &str) -> Option<String> {
        if !alias.starts_with('@') {
            return Some(alias.to_string());
        }
        let (root, _) = root_of(alias);
        match self.roots.get(root)? {
            Entry::Path(path) => Some(format!("{path}{}", &alias[root.len()..])),
            Entry::Nested(entries) => entries
                .iter()
                .find(|(name, _)| covers(name, alias))
                .map(|(name, path)| format!("{path}{}", &alias[name.len()..])),
        }
    }

    /// Like [`get`](Self::get), failing with [`ConfigError::InvalidAlias`].
    pub fn resolve(&self, alias: &str) -> Result<String, ConfigError> {
        self.get(alias)
            .ok_or_else(|| ConfigError::InvalidAlias(alias.to_string()))
    }

    /// The registered alias that covers `alias`, if any.
    pub fn root_alias(&self, alias: &str) -> Option<String> {
        let (root, _) = root_of(alias);
        match self.roots.get(root)? {
            Entry::Path(_) => Some(root.to_string()),
            Entry::Nested(entries) => entries
                .iter()
                .find(|(name, _)| covers(name, alias))
                .map(|(name, _)| name.clone()),
        }
    }

    /// Whether no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

static ALIASES: LazyLock<RwLock<AliasTable>> = LazyLock::new(Default::default);

/// Register or remove a process-wide alias.
pub fn set_alias(alias: &str, path: Option<&str>) -> Result<(), ConfigError> {
    let mut table = ALIASES.write();
    table.set(alias, path)
}

/// Translate a process-wide alias.
///
/// With `throw_on_missing` an uncovered alias is an error; otherwise it
/// yields `Ok(None)`.
pub fn get_alias(alias: &str, throw_on_missing: bool) -> Result<Option<String>, ConfigError> {
    match ALIASES.read().get(alias) {
        Some(path) => Ok(Some(path)),
        None if throw_on_missing => Err(ConfigError::InvalidAlias(alias.to_string())),
        None => Ok(None),
    }
}

/// The registered process-wide alias covering `alias`.
pub fn get_root_alias(alias: &str) -> Option<String> {
    ALIASES.read().root_alias(alias)
}
