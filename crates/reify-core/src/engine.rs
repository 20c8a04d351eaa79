//! Width-dispatched decoding of remote metadata records.
//!
//! A metadata record is a kind tag followed by pointer-width payload words.
//! The engine walks records bottom-up, reading through the
//! [`MemoryReader`] seam and driving the [`TypeBuilder`] with the decoded
//! pieces; all structural validation stays in the builder.
//!
//! Exactly two engine implementations exist — 32-bit and 64-bit targets —
//! behind one object-safe interface, selected once per session by a runtime
//! [`PointerWidth`] flag. This is a closed set, not a plugin surface.
//!
//! ## Record layout
//!
//! All fields are pointer-width words, little-endian:
//!
//! | Kind | Payload |
//! |------|---------|
//! | Class/Struct/Enum | word 1: descriptor address; words 2…: generic argument addresses (count from descriptor) |
//! | Tuple | word 1: element count `n`; words 2‥2+n: element addresses; word 2+n: label string address (0 = unlabeled) |
//! | Function | word 1: flags (bits 0–7 convention, bit 8 throws); word 2: argument count; then argument words (bit 0 = inout); then result address |
//! | Metatype / ExistentialMetatype | word 1: instance address |
//! | ForeignClass | word 1: mangled-name string address |
//! | Opaque | none |
//!
//! A descriptor is: word 0 = mangled-name string address, word 1 = generic
//! parameter count.
//!
//! Unreadable memory latches [`Failure::Memory`] with the faulting address;
//! merely malformed records (unknown tags, absurd counts) decode to the
//! empty sentinel and surface as the boundary default failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{trace, warn};

use reify_types::ty::{FunctionRepr, FunctionTypeFlags, Ty};
use reify_types::RemoteAddress;

use crate::builder::TypeBuilder;
use crate::memory::MemoryReader;
use reify_types::decl::DeclId;

/// Nesting depth bound for record decoding; deeper (or cyclic) metadata is
/// treated as malformed.
const MAX_DECODE_DEPTH: usize = 64;

/// Arity bound for tuple and function records; larger counts are treated as
/// corruption rather than decoded.
const MAX_DECODE_ARITY: u64 = 256;

/// The target's pointer width, declared once per session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    pub fn pointer_size(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

/// The kind tag at the head of a metadata record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataKind {
    Class,
    Struct,
    Enum,
    Tuple,
    Function,
    Metatype,
    ExistentialMetatype,
    ForeignClass,
    Opaque,
}

impl MetadataKind {
    pub fn from_tag(tag: u64) -> Option<MetadataKind> {
        Some(match tag {
            0 => MetadataKind::Class,
            1 => MetadataKind::Struct,
            2 => MetadataKind::Enum,
            3 => MetadataKind::Tuple,
            4 => MetadataKind::Function,
            5 => MetadataKind::Metatype,
            6 => MetadataKind::ExistentialMetatype,
            7 => MetadataKind::ForeignClass,
            8 => MetadataKind::Opaque,
            _ => return None,
        })
    }

    pub fn tag(self) -> u64 {
        match self {
            MetadataKind::Class => 0,
            MetadataKind::Struct => 1,
            MetadataKind::Enum => 2,
            MetadataKind::Tuple => 3,
            MetadataKind::Function => 4,
            MetadataKind::Metatype => 5,
            MetadataKind::ExistentialMetatype => 6,
            MetadataKind::ForeignClass => 7,
            MetadataKind::Opaque => 8,
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One pointer-width specialization of the record walker.
pub trait RuntimeWidth {
    const POINTER_SIZE: usize;
    fn word(bytes: &[u8]) -> u64;
}

/// 32-bit inspected targets.
pub struct Width32;
/// 64-bit inspected targets.
pub struct Width64;

impl RuntimeWidth for Width32 {
    const POINTER_SIZE: usize = 4;
    fn word(bytes: &[u8]) -> u64 {
        u32::from_le_bytes(bytes.try_into().expect("4-byte word")) as u64
    }
}

impl RuntimeWidth for Width64 {
    const POINTER_SIZE: usize = 8;
    fn word(bytes: &[u8]) -> u64 {
        u64::from_le_bytes(bytes.try_into().expect("8-byte word"))
    }
}

/// Object-safe interface over the two width specializations.
pub trait MetadataEngine {
    /// Reconstruct the type described by the metadata record at `address`.
    fn type_at(&self, builder: &mut TypeBuilder<'_>, address: RemoteAddress) -> Option<Ty>;

    /// Decode just the kind tag of the record at `address`.
    fn kind_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
    ) -> Option<MetadataKind>;

    /// Resolve the nominal type descriptor at `address` to a declaration.
    fn nominal_decl_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
    ) -> Option<DeclId>;
}

/// Construct the engine matching the target's pointer width.
pub fn engine_for_width(
    width: PointerWidth,
    reader: Arc<dyn MemoryReader>,
) -> Box<dyn MetadataEngine> {
    match width {
        PointerWidth::Bits32 => Box::new(RecordEngine::<Width32>::new(reader)),
        PointerWidth::Bits64 => Box::new(RecordEngine::<Width64>::new(reader)),
    }
}

/// The concrete record walker, generic over pointer width.
pub struct RecordEngine<W: RuntimeWidth> {
    reader: Arc<dyn MemoryReader>,
    _width: PhantomData<W>,
}

impl<W: RuntimeWidth> RecordEngine<W> {
    pub fn new(reader: Arc<dyn MemoryReader>) -> Self {
        Self {
            reader,
            _width: PhantomData,
        }
    }

    /// Read the `index`-th pointer-width word of the record at `base`.
    fn word_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        base: RemoteAddress,
        index: u64,
    ) -> Option<u64> {
        let address = base.offset(index * W::POINTER_SIZE as u64);
        match self.reader.read_bytes(address, W::POINTER_SIZE) {
            Ok(bytes) => Some(W::word(&bytes)),
            Err(err) => builder.latch_memory(format!("failed to read metadata word: {err}"), address),
        }
    }

    fn string_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
    ) -> Option<String> {
        match self.reader.read_string(address) {
            Ok(string) => Some(string),
            Err(err) => {
                builder.latch_memory(format!("failed to read metadata string: {err}"), address)
            }
        }
    }

    fn type_at_depth(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
        depth: usize,
    ) -> Option<Ty> {
        if depth > MAX_DECODE_DEPTH {
            warn!(%address, "metadata nesting exceeds decode depth bound");
            return None;
        }

        let tag = self.word_at(builder, address, 0)?;
        let Some(kind) = MetadataKind::from_tag(tag) else {
            warn!(%address, tag, "unknown metadata kind tag");
            return None;
        };
        trace!(%address, %kind, depth, "decoding metadata record");

        match kind {
            MetadataKind::Class | MetadataKind::Struct | MetadataKind::Enum => {
                let descriptor = RemoteAddress(self.word_at(builder, address, 1)?);
                let decl = self.nominal_decl_at(builder, descriptor)?;
                let params = self.word_at(builder, descriptor, 1)?;
                if params > MAX_DECODE_ARITY {
                    warn!(%descriptor, params, "implausible generic parameter count");
                    return None;
                }
                if params == 0 {
                    return builder.nominal_type(decl, None);
                }
                let mut args = Vec::with_capacity(params as usize);
                for i in 0..params {
                    let arg = RemoteAddress(self.word_at(builder, address, 2 + i)?);
                    args.push(self.type_at_depth(builder, arg, depth + 1)?);
                }
                builder.bound_generic_type(decl, args, None)
            }

            MetadataKind::Tuple => {
                let count = self.word_at(builder, address, 1)?;
                if count > MAX_DECODE_ARITY {
                    warn!(%address, count, "implausible tuple arity");
                    return None;
                }
                let mut elements = Vec::with_capacity(count as usize);
                for i in 0..count {
                    let element = RemoteAddress(self.word_at(builder, address, 2 + i)?);
                    elements.push(self.type_at_depth(builder, element, depth + 1)?);
                }
                let labels_address = self.word_at(builder, address, 2 + count)?;
                let labels = if labels_address == 0 {
                    String::new()
                } else {
                    self.string_at(builder, RemoteAddress(labels_address))?
                };
                builder.tuple_type(elements, &labels, false)
            }

            MetadataKind::Function => {
                let flags_word = self.word_at(builder, address, 1)?;
                let convention = match flags_word & 0xff {
                    0 => FunctionRepr::Plain,
                    1 => FunctionRepr::Block,
                    2 => FunctionRepr::Thin,
                    3 => FunctionRepr::CFunctionPointer,
                    other => {
                        warn!(%address, convention = other, "unknown function convention");
                        return None;
                    }
                };
                let flags = FunctionTypeFlags {
                    convention,
                    throws: flags_word & 0x100 != 0,
                };

                let count = self.word_at(builder, address, 2)?;
                if count > MAX_DECODE_ARITY {
                    warn!(%address, count, "implausible function arity");
                    return None;
                }
                let mut args = Vec::with_capacity(count as usize);
                let mut inout_args = Vec::with_capacity(count as usize);
                for i in 0..count {
                    let word = self.word_at(builder, address, 3 + i)?;
                    inout_args.push(word & 1 != 0);
                    let arg = RemoteAddress(word & !1);
                    args.push(self.type_at_depth(builder, arg, depth + 1)?);
                }
                let result = RemoteAddress(self.word_at(builder, address, 3 + count)?);
                let output = self.type_at_depth(builder, result, depth + 1)?;
                builder.function_type(&args, &inout_args, output, flags)
            }

            MetadataKind::Metatype => {
                let instance = RemoteAddress(self.word_at(builder, address, 1)?);
                let instance = self.type_at_depth(builder, instance, depth + 1)?;
                builder.metatype_type(instance)
            }

            MetadataKind::ExistentialMetatype => {
                let instance = RemoteAddress(self.word_at(builder, address, 1)?);
                let instance = self.type_at_depth(builder, instance, depth + 1)?;
                builder.existential_metatype_type(instance)
            }

            MetadataKind::ForeignClass => {
                let name_address = RemoteAddress(self.word_at(builder, address, 1)?);
                let mangled = self.string_at(builder, name_address)?;
                builder.foreign_class_type_from_mangled(&mangled)
            }

            MetadataKind::Opaque => builder.opaque_type(),
        }
    }
}

impl<W: RuntimeWidth> MetadataEngine for RecordEngine<W> {
    fn type_at(&self, builder: &mut TypeBuilder<'_>, address: RemoteAddress) -> Option<Ty> {
        self.type_at_depth(builder, address, 0)
    }

    fn kind_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
    ) -> Option<MetadataKind> {
        let tag = self.word_at(builder, address, 0)?;
        MetadataKind::from_tag(tag)
    }

    fn nominal_decl_at(
        &self,
        builder: &mut TypeBuilder<'_>,
        address: RemoteAddress,
    ) -> Option<DeclId> {
        let name_address = RemoteAddress(self.word_at(builder, address, 0)?);
        let mangled = self.string_at(builder, name_address)?;
        builder.nominal_decl_from_mangled(&mangled)
    }
}
