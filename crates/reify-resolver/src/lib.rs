//! Declaration resolution over demangled symbol paths.
//!
//! This crate walks a read-only symbol-path [`Node`] tree to the unique
//! declaration it names, against an arbitrary [`SymbolTable`] backing.
//! The path comes from an inspected process that may be stale, corrupted,
//! or adversarial, so a declared nesting that does not exactly mirror the
//! table is a resolution failure, never a best-effort match.
//!
//! ## Key entry points
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`find_decl_context`] | Resolve a symbol path to its declaration |
//! | [`find_nominal_decl`] | Unique member lookup within a resolved context |
//! | [`foreign::find_foreign_nominal`] | Fallback against a bridged importer |
//!
//! Ambiguity is deliberately silent: zero matches and multiple matches both
//! collapse into `None`, and the caller surfaces a single "could not
//! resolve" failure. A `warn!` trace is the only place the distinction is
//! observable.
//!
//! Known gaps, carried over as explicit unsupported arms rather than
//! fallthroughs: extension contexts and non-type local contexts do not
//! resolve.

pub mod foreign;

use reify_types::decl::{DeclCategory, DeclId, SymbolTable};
use reify_types::symbol::{mangle, Node, NodeKind};
use tracing::{debug, warn};

use crate::foreign::{find_foreign_nominal, ForeignImporter};

/// Name of the synthetic module under which bridged foreign declarations are
/// mangled. A nominal whose context chain bottoms out here may fall back to
/// the foreign importer.
pub const FOREIGN_BRIDGE_MODULE: &str = "__C";

/// Resolve a symbol-path node to the unique declaration it names.
///
/// Returns `None` when the path is malformed, names an unsupported context
/// production, or does not resolve to exactly one declaration.
pub fn find_decl_context(
    node: &Node,
    symbols: &dyn SymbolTable,
    foreign: Option<&dyn ForeignImporter>,
) -> Option<DeclId> {
    match node.kind() {
        NodeKind::Type | NodeKind::DeclContext => {
            find_decl_context(node.first_child()?, symbols, foreign)
        }

        NodeKind::Module => find_module(node, symbols),

        NodeKind::Class | NodeKind::Enum | NodeKind::Protocol | NodeKind::Structure => {
            find_nominal_context(node, symbols, foreign)
        }

        // Other productions (identifiers outside a nominal, function and
        // closure contexts) are unsupported context roots.
        NodeKind::Identifier | NodeKind::PrivateDeclName | NodeKind::LocalDeclName => None,
    }
}

fn find_nominal_context(
    node: &Node,
    symbols: &dyn SymbolTable,
    foreign: Option<&dyn ForeignImporter>,
) -> Option<DeclId> {
    let category = DeclCategory::of_node(node.kind())?;
    let decl_name = node.child(1)?;

    // Local declarations resolve by their full mangling against the defining
    // module; no member search is performed.
    if decl_name.kind() == NodeKind::LocalDeclName {
        let module_node = find_module_node(node)?;
        let module = find_module(module_node, symbols)?;
        let mangled = mangle(node);
        debug!(%mangled, "resolving local type by mangling");
        return symbols.lookup_local_type(module, &mangled);
    }

    let (name, discriminator) = match decl_name.kind() {
        NodeKind::Identifier => (decl_name.text(), None),
        NodeKind::PrivateDeclName => (
            decl_name.child(1)?.text(),
            Some(decl_name.child(0)?.text()),
        ),
        // Ignore any other decl-name productions (operators, subscripts).
        _ => return None,
    };

    let context_node = node.child(0)?;
    match find_decl_context(context_node, symbols, foreign) {
        Some(parent) => find_nominal_decl(symbols, parent, name, discriminator, category),
        None => {
            // Backup logic for bridged foreign declarations: only when the
            // unresolved parent is the bridge module itself and the name
            // carries no private discriminator.
            if discriminator.is_none() && is_foreign_module(context_node) {
                find_foreign_nominal(foreign?, symbols, name, category)
            } else {
                None
            }
        }
    }
}

fn find_module(node: &Node, symbols: &dyn SymbolTable) -> Option<DeclId> {
    debug_assert_eq!(node.kind(), NodeKind::Module);
    symbols.module_by_name(node.text())
}

/// The nearest enclosing module node, found by walking first children.
fn find_module_node(node: &Node) -> Option<&Node> {
    if node.kind() == NodeKind::Module {
        return Some(node);
    }
    find_module_node(node.first_child()?)
}

fn is_foreign_module(node: &Node) -> bool {
    match node.kind() {
        NodeKind::DeclContext => node.first_child().is_some_and(is_foreign_module),
        NodeKind::Module => node.text() == FOREIGN_BRIDGE_MODULE,
        _ => false,
    }
}

/// Look up the unique nominal member of `context` with the given name,
/// discriminator, and category.
///
/// Candidates owned by a different module than the context's (re-exports,
/// aliases) are ignored. Zero viable candidates and two or more viable
/// candidates both yield `None`.
pub fn find_nominal_decl(
    symbols: &dyn SymbolTable,
    context: DeclId,
    name: &str,
    discriminator: Option<&str>,
    category: DeclCategory,
) -> Option<DeclId> {
    let module = symbols.module_of(context);
    let mut result = None;

    for candidate in symbols.lookup_member(context, name, discriminator, Some(category)) {
        // Ignore results that aren't actually from the defining module.
        if symbols.module_of(candidate) != module {
            continue;
        }

        // A second viable result makes the lookup ambiguous; give up.
        if result.is_some() {
            warn!(name, "ambiguous member lookup, treating as unresolved");
            return None;
        }
        result = Some(candidate);
    }

    result
}
