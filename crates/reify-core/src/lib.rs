//! Type reconstruction for out-of-process inspection.
//!
//! This crate answers "what type does this address represent?" for tools
//! (debuggers, reflection inspectors) examining a running process without
//! access to its compiler. Two untrusted inputs feed it: mangled symbol
//! paths, and metadata records read from the inspected address space.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  RemoteSession   │  ◄── Four public queries, Outcome boundary
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  MetadataEngine  │ ──► │   MemoryReader   │  ◄── Trait seam
//! │  (32/64-bit)     │     └──────────────────┘
//! └────────┬─────────┘
//!          │ decoded pieces, bottom-up
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   TypeBuilder    │ ──► │   TypeChecker    │  ◄── Synthesized generics
//! │  (validation +   │     └──────────────────┘
//! │   failure latch) │ ──► SymbolTable / ForeignImporter
//! └──────────────────┘
//! ```
//!
//! Deep construction communicates failure as data: an empty value plus at
//! most one latched [`Failure`](reify_types::Failure) per query, converted
//! into an [`Outcome`](reify_types::Outcome) only at the session boundary.
//!
//! A session is single-threaded by contract: queries must be serialized, or
//! use one session per worker.

pub mod builder;
pub mod checker;
pub mod engine;
pub mod memory;
pub mod session;

pub use builder::{HostContext, TypeBuilder};
pub use checker::{ScratchContext, TableChecker, TypeChecker, TypeExpr};
pub use engine::{MetadataEngine, MetadataKind, PointerWidth};
pub use memory::{MemoryImage, MemoryReader};
pub use session::RemoteSession;
