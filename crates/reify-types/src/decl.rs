//! Declaration handles and the symbol-table seam.
//!
//! Declarations are never created by the reconstruction core — only looked
//! up. [`SymbolTable`] abstracts over the host's module system, allowing
//! different backings:
//! - [`DeclTable`]: an in-memory table, also used as the test fixture
//! - Future: a live compiler session, a serialized symbol index, etc.
//!
//! Handles issued by one table are only meaningful against that table;
//! accessor methods may panic when handed a foreign handle.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use crate::symbol::NodeKind;

/// An opaque handle to a declaration in a [`SymbolTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeclId(pub(crate) u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// The category of a declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeclCategory {
    Module,
    Class,
    Enum,
    Protocol,
    Struct,
}

impl DeclCategory {
    /// Whether this category is one of the four nominal shapes.
    pub fn is_nominal(self) -> bool {
        self != DeclCategory::Module
    }

    /// The declaration category named by a nominal symbol node, if any.
    pub fn of_node(kind: NodeKind) -> Option<DeclCategory> {
        match kind {
            NodeKind::Class => Some(DeclCategory::Class),
            NodeKind::Enum => Some(DeclCategory::Enum),
            NodeKind::Protocol => Some(DeclCategory::Protocol),
            NodeKind::Structure => Some(DeclCategory::Struct),
            _ => None,
        }
    }
}

/// Candidate list returned by member lookup. Most lookups produce zero or one
/// candidate; ambiguity is rare.
pub type Candidates = SmallVec<[DeclId; 4]>;

/// Read-only queries against the host's symbol table and module system.
///
/// The reconstruction core treats the table as a black box: it resolves
/// names to handles and asks structural questions about handles, nothing
/// more.
pub trait SymbolTable {
    /// The category of a declaration.
    fn category(&self, id: DeclId) -> DeclCategory;

    /// The declared name of a declaration.
    fn name(&self, id: DeclId) -> &str;

    /// The immediately enclosing context, or `None` for a module.
    fn parent(&self, id: DeclId) -> Option<DeclId>;

    /// The number of generic parameters; zero means non-generic.
    fn generic_params(&self, id: DeclId) -> usize;

    /// Look up a loaded module by its textual name.
    fn module_by_name(&self, name: &str) -> Option<DeclId>;

    /// All loaded modules, in load order. Earlier modules shadow later ones
    /// during unqualified lookup.
    fn modules(&self) -> Vec<DeclId>;

    /// Enumerate the members of `context` matching `name`, the private
    /// `discriminator` (exactly: an undiscriminated lookup does not see
    /// private members), and `category` (`None` accepts any nominal).
    fn lookup_member(
        &self,
        context: DeclId,
        name: &str,
        discriminator: Option<&str>,
        category: Option<DeclCategory>,
    ) -> Candidates;

    /// Look up a local (function-scoped) type of `module` by the canonical
    /// mangling of its full symbol path.
    fn lookup_local_type(&self, module: DeclId, mangled: &str) -> Option<DeclId>;

    /// The module that owns a declaration: the root of its parent chain.
    fn module_of(&self, id: DeclId) -> DeclId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug)]
struct DeclData {
    name: String,
    category: DeclCategory,
    parent: Option<DeclId>,
    generic_params: usize,
    discriminator: Option<String>,
}

/// An in-memory [`SymbolTable`].
///
/// Declarations are registered through the `add_*` methods; the insertion
/// order of modules is their load order. Duplicate registrations are allowed
/// deliberately — ambiguous tables are part of the threat model this
/// workspace defends against, and tests rely on being able to construct
/// them.
#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<DeclData>,
    modules: Vec<DeclId>,
    module_index: HashMap<String, DeclId>,
    local_types: HashMap<(DeclId, String), DeclId>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Registering a name twice returns the original
    /// handle.
    pub fn add_module(&mut self, name: impl Into<String>) -> DeclId {
        let name = name.into();
        if let Some(&existing) = self.module_index.get(&name) {
            return existing;
        }
        let id = self.push(DeclData {
            name: name.clone(),
            category: DeclCategory::Module,
            parent: None,
            generic_params: 0,
            discriminator: None,
        });
        self.modules.push(id);
        self.module_index.insert(name, id);
        id
    }

    /// Register a nominal declaration inside `parent` (a module or another
    /// nominal).
    pub fn add_nominal(
        &mut self,
        category: DeclCategory,
        parent: DeclId,
        name: impl Into<String>,
        generic_params: usize,
    ) -> DeclId {
        debug_assert!(category.is_nominal());
        self.push(DeclData {
            name: name.into(),
            category,
            parent: Some(parent),
            generic_params,
            discriminator: None,
        })
    }

    /// Register a file-private nominal declaration with its discriminator.
    pub fn add_private_nominal(
        &mut self,
        category: DeclCategory,
        parent: DeclId,
        name: impl Into<String>,
        discriminator: impl Into<String>,
        generic_params: usize,
    ) -> DeclId {
        debug_assert!(category.is_nominal());
        self.push(DeclData {
            name: name.into(),
            category,
            parent: Some(parent),
            generic_params,
            discriminator: Some(discriminator.into()),
        })
    }

    /// Associate a declaration with the canonical mangling of a local symbol
    /// path, making it reachable through `lookup_local_type`.
    pub fn register_local_type(
        &mut self,
        module: DeclId,
        mangled: impl Into<String>,
        decl: DeclId,
    ) {
        self.local_types.insert((module, mangled.into()), decl);
    }

    fn push(&mut self, data: DeclData) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(data);
        id
    }

    fn data(&self, id: DeclId) -> &DeclData {
        &self.decls[id.0 as usize]
    }
}

impl SymbolTable for DeclTable {
    fn category(&self, id: DeclId) -> DeclCategory {
        self.data(id).category
    }

    fn name(&self, id: DeclId) -> &str {
        &self.data(id).name
    }

    fn parent(&self, id: DeclId) -> Option<DeclId> {
        self.data(id).parent
    }

    fn generic_params(&self, id: DeclId) -> usize {
        self.data(id).generic_params
    }

    fn module_by_name(&self, name: &str) -> Option<DeclId> {
        self.module_index.get(name).copied()
    }

    fn modules(&self) -> Vec<DeclId> {
        self.modules.clone()
    }

    fn lookup_member(
        &self,
        context: DeclId,
        name: &str,
        discriminator: Option<&str>,
        category: Option<DeclCategory>,
    ) -> Candidates {
        let mut found = Candidates::new();
        for (index, data) in self.decls.iter().enumerate() {
            if data.parent != Some(context) || data.name != name {
                continue;
            }
            if data.discriminator.as_deref() != discriminator {
                continue;
            }
            if category.is_some_and(|wanted| wanted != data.category) {
                continue;
            }
            if !data.category.is_nominal() {
                continue;
            }
            found.push(DeclId(index as u32));
        }
        found
    }

    fn lookup_local_type(&self, module: DeclId, mangled: &str) -> Option<DeclId> {
        self.local_types.get(&(module, mangled.to_owned())).copied()
    }
}
