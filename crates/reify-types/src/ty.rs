//! The reconstructed type-value domain.
//!
//! [`Ty`] is the output of the type-construction builder: a tagged value, one
//! case per type-system shape. Values are plain data — no interning, no
//! back-references into the symbol table beyond [`DeclId`] handles — so they
//! can outlive the query that produced them.
//!
//! The "no type" sentinel is *not* a `Ty` case: builder operations return
//! `Option<Ty>`, and `None` is the empty value that propagates strictly
//! upward once any sub-construction has failed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decl::{DeclCategory, DeclId, SymbolTable};

/// Calling convention of a reconstructed function type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionRepr {
    /// The native convention.
    Plain,
    /// A foreign block reference.
    Block,
    /// A thin function with no context.
    Thin,
    /// A C function pointer.
    CFunctionPointer,
}

/// Flags decoded from a function-type metadata record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTypeFlags {
    pub convention: FunctionRepr,
    pub throws: bool,
}

/// Ownership qualifier applied to a storage reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipKind {
    Unowned,
    Unmanaged,
    Weak,
}

impl fmt::Display for OwnershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OwnershipKind::Unowned => "unowned",
            OwnershipKind::Unmanaged => "unmanaged",
            OwnershipKind::Weak => "weak",
        })
    }
}

/// One element of a tuple type: an optional label and the element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    pub label: Option<String>,
    pub ty: Ty,
}

/// A reconstructed type value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// A non-generic nominal type, optionally nested in a parent type.
    Nominal {
        decl: DeclId,
        parent: Option<Box<Ty>>,
    },
    /// A generic nominal type applied to arguments.
    BoundGeneric {
        decl: DeclId,
        args: Vec<Ty>,
        parent: Option<Box<Ty>>,
    },
    /// An ordered, possibly labeled tuple.
    Tuple { elements: Vec<TupleElement> },
    /// A function type. Multi-argument inputs are expressed as a tuple.
    Function {
        input: Box<Ty>,
        output: Box<Ty>,
        repr: FunctionRepr,
        throws: bool,
    },
    /// A protocol as a type.
    Protocol { decl: DeclId },
    /// A composition of protocol types.
    ProtocolComposition { members: Vec<Ty> },
    /// The concrete metatype of an instance type.
    Metatype { instance: Box<Ty> },
    /// The existential metatype of an existential instance type.
    ExistentialMetatype { instance: Box<Ty> },
    /// A generic parameter, identified positionally.
    GenericParam { depth: u32, index: u32 },
    /// A member type dependent on a type parameter.
    DependentMember { base: Box<Ty>, member: String },
    /// An ownership-qualified storage type.
    Ownership {
        kind: OwnershipKind,
        referent: Box<Ty>,
    },
    /// An inout-qualified argument type inside a function input tuple.
    Inout { referent: Box<Ty> },
}

impl Ty {
    /// Whether this type may appear as an ordinary value-producing
    /// expression's result or argument type. Storage qualifiers and inout
    /// slots are not materializable, and a tuple is only as materializable
    /// as its elements.
    pub fn is_materializable(&self) -> bool {
        match self {
            Ty::Inout { .. } | Ty::Ownership { .. } => false,
            Ty::Tuple { elements } => elements.iter().all(|e| e.ty.is_materializable()),
            _ => true,
        }
    }

    /// Whether this is an existential type: a protocol, a protocol
    /// composition, or an existential metatype thereof.
    pub fn is_existential(&self) -> bool {
        matches!(
            self,
            Ty::Protocol { .. } | Ty::ProtocolComposition { .. } | Ty::ExistentialMetatype { .. }
        )
    }

    /// Whether this is a type-parameter-kind type: a generic parameter or a
    /// dependent member rooted in one.
    pub fn is_type_parameter(&self) -> bool {
        match self {
            Ty::GenericParam { .. } => true,
            Ty::DependentMember { base, .. } => base.is_type_parameter(),
            _ => false,
        }
    }

    /// Whether this type is eligible for ownership qualification, i.e. is
    /// class-constrained as far as the reconstruction core can tell.
    pub fn allows_ownership(&self, symbols: &dyn SymbolTable) -> bool {
        match self.nominal_decl() {
            Some(decl) => symbols.category(decl) == DeclCategory::Class,
            None => false,
        }
    }

    /// The declaration behind a nominal or bound-generic value.
    pub fn nominal_decl(&self) -> Option<DeclId> {
        match self {
            Ty::Nominal { decl, .. } | Ty::BoundGeneric { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    /// The parent type of a nominal or bound-generic value.
    pub fn nominal_parent(&self) -> Option<&Ty> {
        match self {
            Ty::Nominal { parent, .. } | Ty::BoundGeneric { parent, .. } => {
                parent.as_deref()
            }
            _ => None,
        }
    }

    /// Render this type against a symbol table, for logs and diagnostics.
    pub fn display<'a>(&'a self, symbols: &'a dyn SymbolTable) -> TyDisplay<'a> {
        TyDisplay { ty: self, symbols }
    }
}

/// Borrowed display adapter pairing a [`Ty`] with the table that can name
/// its declarations.
pub struct TyDisplay<'a> {
    ty: &'a Ty,
    symbols: &'a dyn SymbolTable,
}

impl fmt::Display for TyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ty(self.ty, self.symbols, f)
    }
}

fn write_ty(ty: &Ty, symbols: &dyn SymbolTable, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ty {
        Ty::Nominal { decl, parent } => {
            if let Some(parent) = parent {
                write_ty(parent, symbols, f)?;
                f.write_str(".")?;
            }
            f.write_str(symbols.name(*decl))
        }
        Ty::BoundGeneric { decl, args, parent } => {
            if let Some(parent) = parent {
                write_ty(parent, symbols, f)?;
                f.write_str(".")?;
            }
            f.write_str(symbols.name(*decl))?;
            f.write_str("<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_ty(arg, symbols, f)?;
            }
            f.write_str(">")
        }
        Ty::Tuple { elements } => {
            f.write_str("(")?;
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                if let Some(label) = &element.label {
                    write!(f, "{label}: ")?;
                }
                write_ty(&element.ty, symbols, f)?;
            }
            f.write_str(")")
        }
        Ty::Function {
            input,
            output,
            throws,
            ..
        } => {
            write_ty(input, symbols, f)?;
            f.write_str(if *throws { " throws -> " } else { " -> " })?;
            write_ty(output, symbols, f)
        }
        Ty::Protocol { decl } => f.write_str(symbols.name(*decl)),
        Ty::ProtocolComposition { members } => {
            if members.is_empty() {
                return f.write_str("Any");
            }
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    f.write_str(" & ")?;
                }
                write_ty(member, symbols, f)?;
            }
            Ok(())
        }
        Ty::Metatype { instance } => {
            write_ty(instance, symbols, f)?;
            f.write_str(".Type")
        }
        Ty::ExistentialMetatype { instance } => {
            write_ty(instance, symbols, f)?;
            f.write_str(".Protocol")
        }
        Ty::GenericParam { depth, index } => write!(f, "τ{depth}_{index}"),
        Ty::DependentMember { base, member } => {
            write_ty(base, symbols, f)?;
            write!(f, ".{member}")
        }
        Ty::Ownership { kind, referent } => {
            write!(f, "{kind} ")?;
            write_ty(referent, symbols, f)
        }
        Ty::Inout { referent } => {
            f.write_str("inout ")?;
            write_ty(referent, symbols, f)
        }
    }
}
