//! Fallback resolution against a bridged (non-native) symbol table.
//!
//! Only reachable when primary resolution cannot find a parent context and
//! the path bottoms out in the foreign bridge module. The importer is a
//! black box that enumerates visible declarations by name; this module adds
//! the category filter and the uniqueness requirement on top.

use reify_types::decl::{DeclCategory, DeclId, SymbolTable};
use tracing::warn;

/// Enumeration interface over an imported symbol table.
///
/// Implementations call `found` once per visible declaration matching
/// `name`. Enumeration order is unspecified, and implementations may keep
/// calling `found` after ambiguity has been detected; the consumer side
/// short-circuits.
pub trait ForeignImporter {
    fn lookup_value(&self, name: &str, found: &mut dyn FnMut(DeclId));
}

/// Find the unique foreign declaration with the given name and category.
///
/// Duplicate reports of the same declaration are tolerated; a second
/// *distinct* viable candidate poisons the search and yields `None`.
pub fn find_foreign_nominal(
    importer: &dyn ForeignImporter,
    symbols: &dyn SymbolTable,
    name: &str,
    category: DeclCategory,
) -> Option<DeclId> {
    let mut result: Option<DeclId> = None;
    let mut poisoned = false;

    importer.lookup_value(name, &mut |decl| {
        if poisoned {
            return;
        }
        if symbols.category(decl) != category {
            return;
        }
        match result {
            Some(existing) if existing == decl => {}
            Some(_) => {
                poisoned = true;
                result = None;
            }
            None => result = Some(decl),
        }
    });

    if poisoned {
        warn!(name, "ambiguous foreign lookup, treating as unresolved");
    }
    result
}

/// A fixed-list importer, useful for tests and for hosts that can snapshot
/// their bridged table up front.
#[derive(Debug, Default)]
pub struct StaticImporter {
    visible: Vec<(String, DeclId)>,
}

impl StaticImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a declaration visible under `name`.
    pub fn add(&mut self, name: impl Into<String>, decl: DeclId) {
        self.visible.push((name.into(), decl));
    }
}

impl ForeignImporter for StaticImporter {
    fn lookup_value(&self, name: &str, found: &mut dyn FnMut(DeclId)) {
        for (visible_name, decl) in &self.visible {
            if visible_name == name {
                found(*decl);
            }
        }
    }
}
