//! The failure taxonomy and boundary outcome.
//!
//! Deep construction never throws: it returns the empty sentinel
//! (`Option::None`) and latches at most one [`Failure`] on the builder
//! session. Only the remote-query boundary converts that state into an
//! [`Outcome`] visible to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RemoteAddress;

/// The reason a remote query failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// No more specific cause was recorded. Also the outcome of explicitly
    /// unimplemented operations.
    Unknown,
    /// A described failure reading the inspected process at an address.
    Memory {
        description: String,
        address: RemoteAddress,
    },
    /// Symbol resolution found no unique declaration for a mangled name.
    /// Covers both "absent" and "ambiguous" — the resolver deliberately does
    /// not distinguish them.
    CouldNotResolveTypeDecl { mangled: String },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Unknown => f.write_str("unknown failure"),
            Failure::Memory {
                description,
                address,
            } => write!(f, "memory error at {address}: {description}"),
            Failure::CouldNotResolveTypeDecl { mangled } => {
                write!(f, "could not resolve type declaration for '{mangled}'")
            }
        }
    }
}

impl std::error::Error for Failure {}

/// The result of one top-level remote query.
pub type Outcome<T> = Result<T, Failure>;
