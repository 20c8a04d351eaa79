//! Shared types for the reify workspace.
//!
//! This crate provides the foundational domain model used across the
//! workspace, breaking circular dependency chains:
//!
//! - [`symbol`]: Demangled symbol-path nodes and the canonical mangling codec
//! - [`decl`]: Opaque declaration handles, the [`SymbolTable`](decl::SymbolTable)
//!   seam, and an in-memory [`DeclTable`](decl::DeclTable) implementation
//! - [`ty`]: The reconstructed type-value domain ([`Ty`](ty::Ty)) and its
//!   structural predicates
//! - [`failure`]: The three-kind failure taxonomy and the [`Outcome`](failure::Outcome)
//!   boundary result

pub mod decl;
pub mod failure;
pub mod symbol;
pub mod ty;

// Re-export commonly used types at crate root
pub use decl::{DeclCategory, DeclId, DeclTable, SymbolTable};
pub use failure::{Failure, Outcome};
pub use symbol::{demangle, mangle, Node, NodeKind};
pub use ty::{FunctionRepr, FunctionTypeFlags, OwnershipKind, TupleElement, Ty};

use serde::{Deserialize, Serialize};
use std::fmt;

/// An address in the inspected process, independent of the inspector's own
/// pointer width.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RemoteAddress(pub u64);

impl RemoteAddress {
    /// Offset this address by a byte count, saturating at the top of the
    /// address space rather than wrapping.
    pub fn offset(self, bytes: u64) -> RemoteAddress {
        RemoteAddress(self.0.saturating_add(bytes))
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for RemoteAddress {
    fn from(raw: u64) -> Self {
        RemoteAddress(raw)
    }
}
