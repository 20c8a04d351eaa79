//! The remote session facade.
//!
//! One session pairs one host context (symbol table, checker, optional
//! foreign importer) with one memory reader and one width-specialized
//! engine, all chosen at construction. It exposes the four public remote
//! queries and owns the single point where latched failures become
//! caller-visible outcomes.
//!
//! Queries share the session's failure slot and scratch context, so they
//! must be serialized: one query runs to its finalize step before the next
//! begins. Use one session per worker for parallel inspection. The memory
//! reader is a shared resource; the session takes a reference-counted hold,
//! nothing more.

use std::sync::Arc;
use tracing::debug;

use reify_types::decl::DeclId;
use reify_types::ty::Ty;
use reify_types::{Failure, Outcome, RemoteAddress};

use crate::builder::{HostContext, TypeBuilder};
use crate::engine::{engine_for_width, MetadataEngine, MetadataKind, PointerWidth};
use crate::memory::MemoryReader;

/// A reconstruction session over one inspected process.
pub struct RemoteSession<'a> {
    builder: TypeBuilder<'a>,
    reader: Arc<dyn MemoryReader>,
    engine: Box<dyn MetadataEngine>,
}

impl<'a> RemoteSession<'a> {
    /// Create a session for a target of the given pointer width.
    pub fn new(host: HostContext<'a>, reader: Arc<dyn MemoryReader>, width: PointerWidth) -> Self {
        debug!(?width, "creating remote session");
        let engine = engine_for_width(width, Arc::clone(&reader));
        Self {
            builder: TypeBuilder::new(host),
            reader,
            engine,
        }
    }

    /// The shared memory-reader handle this session holds.
    pub fn reader(&self) -> &Arc<dyn MemoryReader> {
        &self.reader
    }

    /// Reconstruct the type whose metadata record lives at `address`.
    pub fn type_for_metadata(&mut self, address: RemoteAddress) -> Outcome<Ty> {
        let value = self.engine.type_at(&mut self.builder, address);
        self.builder.finalize(value, Failure::Unknown)
    }

    /// Report just the metadata kind of the record at `address`.
    pub fn kind_for_metadata(&mut self, address: RemoteAddress) -> Outcome<MetadataKind> {
        let value = self.engine.kind_at(&mut self.builder, address);
        self.builder.finalize(value, Failure::Unknown)
    }

    /// Resolve the nominal type descriptor at `address` to a declaration.
    pub fn decl_for_nominal_descriptor(&mut self, address: RemoteAddress) -> Outcome<DeclId> {
        let value = self.engine.nominal_decl_at(&mut self.builder, address);
        self.builder.finalize(value, Failure::Unknown)
    }

    /// Byte offset of a stored property within `ty`.
    ///
    /// Not implemented: computing offsets needs the target's field layout
    /// vectors, which this core does not decode. Always fails rather than
    /// fabricating a plausible number.
    pub fn offset_for_property(&mut self, ty: &Ty, property_name: &str) -> Outcome<u64> {
        debug!(
            ty = %ty.display(self.builder.symbols()),
            property_name,
            "property offsets are not implemented"
        );
        self.builder.finalize(None, Failure::Unknown)
    }
}
