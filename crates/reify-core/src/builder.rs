//! The type-construction builder.
//!
//! One operation per type-system shape. Every operation is pure given its
//! already-built inputs: it either returns a valid [`Ty`] or returns the
//! empty sentinel (`None`), optionally latching a [`Failure`] on the session
//! first. The empty sentinel propagates strictly upward — an enclosing
//! construction that consumes an empty sub-expression is itself empty,
//! never "fixed up".
//!
//! Generic applications are not assembled directly. They are re-synthesized
//! as a [`TypeExpr`] and pushed through the host's [`TypeChecker`], anchored
//! in a lazily created scratch context, so the same pipeline that checks
//! source-written types validates reconstructed ones (including detection of
//! shadowing declarations).
//!
//! Known gaps, kept as explicit empty returns: builtin types cannot be
//! reconstructed from their name alone, and the dependent-member protocol
//! hint is accepted but unused.

use reify_resolver::foreign::{find_foreign_nominal, ForeignImporter};
use reify_resolver::{find_decl_context, find_nominal_decl};
use reify_types::decl::{DeclCategory, DeclId, SymbolTable};
use reify_types::symbol::{demangle, mangle, Node};
use reify_types::ty::{FunctionTypeFlags, OwnershipKind, TupleElement, Ty};
use reify_types::{Failure, Outcome, RemoteAddress};
use tracing::debug;

use crate::checker::{ScratchContext, TypeChecker, TypeExpr};

/// Name of the synthetic module anchoring synthesized type expressions.
const SCRATCH_MODULE: &str = ".reify";

/// The host collaborators a builder session works against.
#[derive(Copy, Clone)]
pub struct HostContext<'a> {
    pub symbols: &'a dyn SymbolTable,
    pub checker: &'a dyn TypeChecker,
    pub foreign: Option<&'a dyn ForeignImporter>,
}

/// A type-construction session.
///
/// Holds the single pending-failure slot and the lazily created scratch
/// context. Not safe for concurrent queries: callers serialize top-level
/// queries per session, finishing each with [`finalize`](Self::finalize).
pub struct TypeBuilder<'a> {
    host: HostContext<'a>,
    pending: Option<Failure>,
    scratch: Option<ScratchContext>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(host: HostContext<'a>) -> Self {
        Self {
            host,
            pending: None,
            scratch: None,
        }
    }

    pub fn symbols(&self) -> &'a dyn SymbolTable {
        self.host.symbols
    }

    // =========================================================================
    // Failure protocol
    // =========================================================================

    /// Latch a failure — first failure wins — and return the empty sentinel
    /// of whatever type the caller expected.
    pub fn latch<T>(&mut self, failure: Failure) -> Option<T> {
        if self.pending.is_none() {
            debug!(%failure, "latching failure");
            self.pending = Some(failure);
        }
        None
    }

    /// Latch a memory-read failure at a specific remote address.
    pub fn latch_memory<T>(
        &mut self,
        description: impl Into<String>,
        address: RemoteAddress,
    ) -> Option<T> {
        self.latch(Failure::Memory {
            description: description.into(),
            address,
        })
    }

    /// The currently latched failure, if any. Observational only.
    pub fn pending(&self) -> Option<&Failure> {
        self.pending.as_ref()
    }

    /// Convert the session state into a boundary outcome, consuming any
    /// latched failure. Call exactly once per top-level query, after the
    /// final (possibly empty) value is known.
    pub fn finalize<T>(&mut self, value: Option<T>, default: Failure) -> Outcome<T> {
        if let Some(failure) = self.pending.take() {
            return Err(failure);
        }
        match value {
            Some(value) => Ok(value),
            None => Err(default),
        }
    }

    // =========================================================================
    // Declaration resolution
    // =========================================================================

    /// Resolve a mangled name to a nominal declaration.
    pub fn nominal_decl_from_mangled(&mut self, mangled: &str) -> Option<DeclId> {
        let node = demangle(mangled)?;
        self.nominal_decl_from_node(&node)
    }

    /// Resolve a symbol-path node to a nominal declaration. An unresolvable
    /// path latches [`Failure::CouldNotResolveTypeDecl`]; a path resolving
    /// to a non-nominal context (a module) is empty without latching.
    pub fn nominal_decl_from_node(&mut self, node: &Node) -> Option<DeclId> {
        let Some(context) = find_decl_context(node, self.host.symbols, self.host.foreign) else {
            return self.latch(Failure::CouldNotResolveTypeDecl {
                mangled: mangle(node),
            });
        };
        if !self.host.symbols.category(context).is_nominal() {
            return None;
        }
        Some(context)
    }

    // =========================================================================
    // Construction operations
    // =========================================================================

    /// A non-generic nominal reference. The declaration must not be generic,
    /// and `parent` must mirror its declared nesting exactly.
    pub fn nominal_type(&mut self, decl: DeclId, parent: Option<Ty>) -> Option<Ty> {
        if self.host.symbols.generic_params(decl) != 0 {
            return None;
        }
        if !self.validate_nominal_parent(decl, parent.as_ref()) {
            return None;
        }
        Some(Ty::Nominal {
            decl,
            parent: parent.map(Box::new),
        })
    }

    /// A generic application, validated by re-synthesis through the host
    /// checker rather than assembled directly.
    pub fn bound_generic_type(
        &mut self,
        decl: DeclId,
        args: Vec<Ty>,
        parent: Option<Ty>,
    ) -> Option<Ty> {
        let symbols = self.host.symbols;
        let params = symbols.generic_params(decl);
        if params == 0 || args.len() != params {
            return None;
        }
        if !self.validate_nominal_parent(decl, parent.as_ref()) {
            return None;
        }

        let applied = TypeExpr::Named {
            name: symbols.name(decl).to_owned(),
            args: args.into_iter().map(TypeExpr::Fixed).collect(),
        };

        // With a parent, re-express the whole nesting path outermost-first,
        // each ancestor as a plain name or its own generic application.
        let expr = match &parent {
            None => applied,
            Some(parent_ty) => {
                let mut ancestry = Vec::new();
                let mut cursor = Some(parent_ty);
                while let Some(ty) = cursor {
                    ancestry.push(ty);
                    cursor = ty.nominal_parent();
                }

                let mut components = Vec::with_capacity(ancestry.len() + 1);
                for ancestor in ancestry.into_iter().rev() {
                    components.push(match ancestor {
                        Ty::Nominal { decl, .. } => TypeExpr::Named {
                            name: symbols.name(*decl).to_owned(),
                            args: Vec::new(),
                        },
                        Ty::BoundGeneric { decl, args, .. } => TypeExpr::Named {
                            name: symbols.name(*decl).to_owned(),
                            args: args.iter().cloned().map(TypeExpr::Fixed).collect(),
                        },
                        _ => return None,
                    });
                }
                components.push(applied);
                TypeExpr::Path(components)
            }
        };

        let checked = self.check_synthesized(&expr)?;

        // Reject shadowing: the checker must have landed on this very
        // declaration.
        if let Ty::BoundGeneric { decl: found, .. } = &checked {
            if *found != decl {
                debug!(expected = %decl, found = %found, "generic re-check resolved a shadowing decl");
                return None;
            }
        }
        Some(checked)
    }

    /// An ordered tuple. Variadic tuples are not reconstructable. Labels are
    /// space-separated, consumed left-to-right; an empty segment leaves the
    /// element unlabeled.
    pub fn tuple_type(
        &mut self,
        element_types: Vec<Ty>,
        labels: &str,
        is_variadic: bool,
    ) -> Option<Ty> {
        if is_variadic {
            return None;
        }

        let mut rest = labels;
        let elements = element_types
            .into_iter()
            .map(|ty| {
                let label = if rest.is_empty() {
                    None
                } else {
                    let (head, tail) = rest.split_once(' ').unwrap_or((rest, ""));
                    rest = tail;
                    (!head.is_empty()).then(|| head.to_owned())
                };
                TupleElement { label, ty }
            })
            .collect();
        Some(Ty::Tuple { elements })
    }

    /// A function type. The result and every argument type must be
    /// materializable (checked before inout wrapping). A single argument is
    /// the input directly; multiple arguments form an argument tuple with
    /// inout-flagged members wrapped.
    pub fn function_type(
        &mut self,
        args: &[Ty],
        inout_args: &[bool],
        output: Ty,
        flags: FunctionTypeFlags,
    ) -> Option<Ty> {
        if args.len() != inout_args.len() {
            return None;
        }
        if !output.is_materializable() {
            return None;
        }
        if args.iter().any(|arg| !arg.is_materializable()) {
            return None;
        }

        let input = match args {
            [single] => single.clone(),
            _ => Ty::Tuple {
                elements: args
                    .iter()
                    .zip(inout_args)
                    .map(|(arg, &inout)| {
                        let ty = if inout {
                            Ty::Inout {
                                referent: Box::new(arg.clone()),
                            }
                        } else {
                            arg.clone()
                        };
                        TupleElement { label: None, ty }
                    })
                    .collect(),
            },
        };

        Some(Ty::Function {
            input: Box::new(input),
            output: Box::new(output),
            repr: flags.convention,
            throws: flags.throws,
        })
    }

    /// A protocol reference, resolved uniquely by name within its module.
    /// The mangled form is carried by the metadata record but not consulted.
    pub fn protocol_type(
        &mut self,
        _mangled: &str,
        module_name: &str,
        protocol_name: &str,
    ) -> Option<Ty> {
        let module = self.host.symbols.module_by_name(module_name)?;
        let decl = find_nominal_decl(
            self.host.symbols,
            module,
            protocol_name,
            None,
            DeclCategory::Protocol,
        )?;
        Some(Ty::Protocol { decl })
    }

    /// A composition of protocol types; every member must itself be one.
    pub fn protocol_composition_type(&mut self, members: Vec<Ty>) -> Option<Ty> {
        if members.iter().any(|m| !matches!(m, Ty::Protocol { .. })) {
            return None;
        }
        Some(Ty::ProtocolComposition { members })
    }

    /// The existential metatype of an existential instance type.
    pub fn existential_metatype_type(&mut self, instance: Ty) -> Option<Ty> {
        if !instance.is_existential() {
            return None;
        }
        Some(Ty::ExistentialMetatype {
            instance: Box::new(instance),
        })
    }

    /// The concrete metatype of any instance type.
    pub fn metatype_type(&mut self, instance: Ty) -> Option<Ty> {
        Some(Ty::Metatype {
            instance: Box::new(instance),
        })
    }

    /// A generic parameter reference. Always succeeds.
    pub fn generic_param_type(&mut self, depth: u32, index: u32) -> Option<Ty> {
        Some(Ty::GenericParam { depth, index })
    }

    /// A member type off a type parameter. The protocol hint is accepted for
    /// interface parity but not yet used for constraint lookup.
    pub fn dependent_member_type(
        &mut self,
        member: &str,
        base: Ty,
        _protocol_hint: Option<Ty>,
    ) -> Option<Ty> {
        if !base.is_type_parameter() {
            return None;
        }
        Some(Ty::DependentMember {
            base: Box::new(base),
            member: member.to_owned(),
        })
    }

    /// An ownership-qualified storage type; the base must be
    /// class-constrained.
    pub fn ownership_qualified_type(&mut self, kind: OwnershipKind, base: Ty) -> Option<Ty> {
        if !base.allows_ownership(self.host.symbols) {
            return None;
        }
        Some(Ty::Ownership {
            kind,
            referent: Box::new(base),
        })
    }

    /// A bridged foreign class looked up by bare name.
    pub fn foreign_class_type_by_name(&mut self, name: &str) -> Option<Ty> {
        let importer = self.host.foreign?;
        let decl =
            find_foreign_nominal(importer, self.host.symbols, name, DeclCategory::Class)?;
        self.nominal_type(decl, None)
    }

    /// A foreign class resolved from its mangled name.
    pub fn foreign_class_type_from_mangled(&mut self, mangled: &str) -> Option<Ty> {
        let decl = self.nominal_decl_from_mangled(mangled)?;
        self.nominal_type(decl, None)
    }

    /// Builtin types cannot be reconstructed from the name alone; always
    /// empty rather than a fabricated lookalike.
    pub fn builtin_type(&mut self, _name: &str) -> Option<Ty> {
        None
    }

    /// The "no information" sentinel for an unnamed foreign class. Never
    /// latches.
    pub fn unnamed_foreign_class_type(&mut self) -> Option<Ty> {
        None
    }

    /// The "no information" sentinel for an opaque type. Never latches.
    pub fn opaque_type(&mut self) -> Option<Ty> {
        None
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// A declared nesting must exactly mirror the declaration's actual
    /// enclosing-context chain: same declarations, same length.
    fn validate_nominal_parent(&self, decl: DeclId, parent: Option<&Ty>) -> bool {
        let symbols = self.host.symbols;
        let enclosing = nominal_parent_decl(symbols, decl);

        let Some(parent) = parent else {
            return enclosing.is_none();
        };
        let Some(mut expected) = enclosing else {
            return false;
        };

        let mut cursor = Some(parent);
        loop {
            let Some(ty) = cursor else {
                return false;
            };
            if ty.nominal_decl() != Some(expected) {
                return false;
            }
            cursor = ty.nominal_parent();
            match nominal_parent_decl(symbols, expected) {
                Some(next) => expected = next,
                None => return cursor.is_none(),
            }
        }
    }

    fn check_synthesized(&mut self, expr: &TypeExpr) -> Option<Ty> {
        let scratch = self
            .scratch
            .get_or_insert_with(|| ScratchContext::new(SCRATCH_MODULE));
        self.host.checker.check(expr, scratch)
    }
}

/// The enclosing *nominal* context of a declaration, skipping its module.
fn nominal_parent_decl(symbols: &dyn SymbolTable, decl: DeclId) -> Option<DeclId> {
    symbols
        .parent(decl)
        .filter(|&p| symbols.category(p).is_nominal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::TableChecker;
    use reify_types::decl::DeclTable;
    use reify_types::symbol::NodeKind;
    use reify_types::ty::FunctionRepr;

    struct Fixture {
        table: DeclTable,
        point: DeclId,
        boxed: DeclId,
        int: DeclId,
        outer: DeclId,
        inner: DeclId,
        widget: DeclId,
    }

    fn fixture() -> Fixture {
        let mut table = DeclTable::new();
        let lib = table.add_module("Lib");
        let point = table.add_nominal(DeclCategory::Struct, lib, "Point", 0);
        let boxed = table.add_nominal(DeclCategory::Struct, lib, "Box", 1);
        let int = table.add_nominal(DeclCategory::Struct, lib, "Int", 0);
        let outer = table.add_nominal(DeclCategory::Struct, lib, "Outer", 0);
        let inner = table.add_nominal(DeclCategory::Class, outer, "Inner", 1);
        let widget = table.add_nominal(DeclCategory::Class, lib, "Widget", 0);
        Fixture {
            table,
            point,
            boxed,
            int,
            outer,
            inner,
            widget,
        }
    }

    fn with_builder<R>(
        fixture: &Fixture,
        run: impl FnOnce(&mut TypeBuilder<'_>, &Fixture) -> R,
    ) -> R {
        let checker = TableChecker::new(&fixture.table);
        let mut builder = TypeBuilder::new(HostContext {
            symbols: &fixture.table,
            checker: &checker,
            foreign: None,
        });
        run(&mut builder, fixture)
    }

    fn nominal(decl: DeclId) -> Ty {
        Ty::Nominal { decl, parent: None }
    }

    #[test]
    fn test_nominal_rejects_generic_decls_and_spurious_parents() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            // Top-level non-generic: succeeds with no parent only.
            assert!(builder.nominal_type(fx.point, None).is_some());
            assert_eq!(builder.nominal_type(fx.point, Some(nominal(fx.outer))), None);

            // Generic declarations never build a plain nominal.
            assert_eq!(builder.nominal_type(fx.boxed, None), None);
        });
    }

    #[test]
    fn test_nominal_parent_chain_must_mirror_nesting() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let inner_args = vec![nominal(fx.int)];

            // Exact chain accepted.
            assert!(builder
                .bound_generic_type(fx.inner, inner_args.clone(), Some(nominal(fx.outer)))
                .is_some());

            // Missing parent rejected.
            assert_eq!(builder.bound_generic_type(fx.inner, inner_args.clone(), None), None);

            // Wrong parent in the same module rejected.
            assert_eq!(
                builder.bound_generic_type(fx.inner, inner_args, Some(nominal(fx.point))),
                None
            );
        });
    }

    #[test]
    fn test_bound_generic_checks_arity() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            assert!(builder
                .bound_generic_type(fx.boxed, vec![nominal(fx.int)], None)
                .is_some());
            assert_eq!(builder.bound_generic_type(fx.boxed, vec![], None), None);
            assert_eq!(
                builder.bound_generic_type(
                    fx.boxed,
                    vec![nominal(fx.int), nominal(fx.int)],
                    None
                ),
                None
            );
            // Non-generic decls never build a bound generic.
            assert_eq!(
                builder.bound_generic_type(fx.point, vec![nominal(fx.int)], None),
                None
            );
        });
    }

    #[test]
    fn test_bound_generic_rejects_shadowing_decl() {
        // Two modules each declare a generic `Box`; the earlier one shadows
        // unqualified lookup, so re-checking an application of the later one
        // resolves to the wrong declaration and must be rejected.
        let mut table = DeclTable::new();
        let first = table.add_module("First");
        let second = table.add_module("Second");
        let shadowing = table.add_nominal(DeclCategory::Struct, first, "Box", 1);
        let shadowed = table.add_nominal(DeclCategory::Struct, second, "Box", 1);
        let int = table.add_nominal(DeclCategory::Struct, first, "Int", 0);

        let checker = TableChecker::new(&table);
        let mut builder = TypeBuilder::new(HostContext {
            symbols: &table,
            checker: &checker,
            foreign: None,
        });

        let built = builder
            .bound_generic_type(shadowing, vec![nominal(int)], None)
            .expect("unshadowed application builds");
        assert_eq!(built.nominal_decl(), Some(shadowing));

        assert_eq!(
            builder.bound_generic_type(shadowed, vec![nominal(int)], None),
            None
        );
        // Shadowing is a construction failure, not a latched error.
        assert_eq!(builder.pending(), None);
    }

    #[test]
    fn test_variadic_tuple_always_fails() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            assert_eq!(builder.tuple_type(vec![], "", true), None);
            assert_eq!(builder.tuple_type(vec![nominal(fx.int)], "x", true), None);
        });
    }

    #[test]
    fn test_tuple_labels_pair_positionally() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let ty = builder
                .tuple_type(
                    vec![nominal(fx.int), nominal(fx.int), nominal(fx.point)],
                    "x  z",
                    false,
                )
                .expect("builds");
            let Ty::Tuple { elements } = ty else {
                panic!("expected tuple");
            };
            let labels: Vec<_> = elements.iter().map(|e| e.label.as_deref()).collect();
            assert_eq!(labels, vec![Some("x"), None, Some("z")]);
        });
    }

    #[test]
    fn test_function_requires_materializable_pieces() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let flags = FunctionTypeFlags {
                convention: FunctionRepr::Plain,
                throws: false,
            };
            let weak_widget = Ty::Ownership {
                kind: OwnershipKind::Weak,
                referent: Box::new(nominal(fx.widget)),
            };

            // Non-materializable result fails regardless of arguments.
            assert_eq!(
                builder.function_type(&[nominal(fx.int)], &[false], weak_widget.clone(), flags),
                None
            );
            // Non-materializable argument fails before inout wrapping.
            assert_eq!(
                builder.function_type(&[weak_widget], &[true], nominal(fx.int), flags),
                None
            );
        });
    }

    #[test]
    fn test_function_single_argument_is_not_tupled() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let flags = FunctionTypeFlags {
                convention: FunctionRepr::Plain,
                throws: true,
            };
            let ty = builder
                .function_type(&[nominal(fx.int)], &[false], nominal(fx.point), flags)
                .expect("builds");
            let Ty::Function { input, throws, .. } = ty else {
                panic!("expected function");
            };
            assert!(!matches!(*input, Ty::Tuple { .. }));
            assert!(throws);
        });
    }

    #[test]
    fn test_function_multi_argument_tuples_with_inout() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let flags = FunctionTypeFlags {
                convention: FunctionRepr::CFunctionPointer,
                throws: false,
            };
            let ty = builder
                .function_type(
                    &[nominal(fx.int), nominal(fx.point)],
                    &[false, true],
                    nominal(fx.int),
                    flags,
                )
                .expect("builds");
            let Ty::Function { input, repr, .. } = ty else {
                panic!("expected function");
            };
            assert_eq!(repr, FunctionRepr::CFunctionPointer);
            let Ty::Tuple { elements } = *input else {
                panic!("expected argument tuple");
            };
            assert!(matches!(elements[0].ty, Ty::Nominal { .. }));
            assert!(matches!(elements[1].ty, Ty::Inout { .. }));
        });
    }

    #[test]
    fn test_composition_and_existential_metatype_validation() {
        let mut table = DeclTable::new();
        let lib = table.add_module("Lib");
        let hashable = table.add_nominal(DeclCategory::Protocol, lib, "Hashable", 0);
        let point = table.add_nominal(DeclCategory::Struct, lib, "Point", 0);
        let checker = TableChecker::new(&table);
        let mut builder = TypeBuilder::new(HostContext {
            symbols: &table,
            checker: &checker,
            foreign: None,
        });

        let protocol = builder
            .protocol_type("", "Lib", "Hashable")
            .expect("protocol resolves");
        assert_eq!(protocol, Ty::Protocol { decl: hashable });

        let composition = builder
            .protocol_composition_type(vec![protocol.clone()])
            .expect("composition of protocols");
        assert!(builder
            .existential_metatype_type(composition)
            .is_some());

        // Non-protocol members and non-existential instances fail.
        assert_eq!(
            builder.protocol_composition_type(vec![nominal(point)]),
            None
        );
        assert_eq!(builder.existential_metatype_type(nominal(point)), None);
        // The plain metatype has no such restriction.
        assert!(builder.metatype_type(nominal(point)).is_some());
    }

    #[test]
    fn test_dependent_member_requires_type_parameter_base() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let param = builder.generic_param_type(0, 0).expect("always builds");
            assert!(builder
                .dependent_member_type("Element", param, None)
                .is_some());
            assert_eq!(
                builder.dependent_member_type("Element", nominal(fx.point), None),
                None
            );
        });
    }

    #[test]
    fn test_ownership_requires_class_constrained_base() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            assert!(builder
                .ownership_qualified_type(OwnershipKind::Weak, nominal(fx.widget))
                .is_some());
            // A value-kind base is a plain construction failure: empty, with
            // nothing latched.
            assert_eq!(
                builder.ownership_qualified_type(OwnershipKind::Weak, nominal(fx.point)),
                None
            );
            assert_eq!(builder.pending(), None);
        });
    }

    #[test]
    fn test_unresolved_decl_latches_mangled_name() {
        let fx = fixture();
        with_builder(&fx, |builder, _| {
            assert_eq!(builder.nominal_decl_from_mangled("SM3LibI4Gone"), None);
            assert_eq!(
                builder.pending(),
                Some(&Failure::CouldNotResolveTypeDecl {
                    mangled: "SM3LibI4Gone".into()
                })
            );
        });
    }

    #[test]
    fn test_module_path_is_empty_without_latching() {
        let fx = fixture();
        with_builder(&fx, |builder, _| {
            let node = Node::module("Lib");
            assert_eq!(builder.nominal_decl_from_node(&node), None);
            assert_eq!(builder.pending(), None);
        });
    }

    #[test]
    fn test_latch_once_first_failure_wins() {
        let fx = fixture();
        with_builder(&fx, |builder, _| {
            let first = Failure::CouldNotResolveTypeDecl {
                mangled: "SM3LibI4Gone".into(),
            };
            let second = Failure::Memory {
                description: "late".into(),
                address: RemoteAddress(0x10),
            };
            assert_eq!(builder.latch::<Ty>(first.clone()), None);
            assert_eq!(builder.latch::<Ty>(second), None);
            assert_eq!(builder.pending(), Some(&first));

            let outcome: Outcome<Ty> = builder.finalize(None, Failure::Unknown);
            assert_eq!(outcome, Err(first));
            // The slot is consumed; the next query starts clean.
            assert_eq!(builder.pending(), None);
        });
    }

    #[test]
    fn test_finalize_defaults_when_nothing_latched() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let value = nominal(fx.point);
            assert_eq!(
                builder.finalize(Some(value.clone()), Failure::Unknown),
                Ok(value)
            );
            assert_eq!(
                builder.finalize::<Ty>(None, Failure::Unknown),
                Err(Failure::Unknown)
            );
        });
    }

    #[test]
    fn test_resolution_round_trip_from_node() {
        let fx = fixture();
        with_builder(&fx, |builder, fx| {
            let node = Node::type_of(Node::nominal(
                NodeKind::Structure,
                Node::module("Lib"),
                Node::identifier("Point"),
            ));
            let decl = builder.nominal_decl_from_node(&node).expect("resolves");
            assert_eq!(decl, fx.point);

            let again = builder
                .nominal_decl_from_mangled(&mangle(&node))
                .expect("resolves from mangled");
            assert_eq!(again, decl);
        });
    }
}
