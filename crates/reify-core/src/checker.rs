//! Checking of synthesized type expressions.
//!
//! The builder never assembles a bound-generic value by hand. It re-expresses
//! the application as a [`TypeExpr`] — the same shape a source-written type
//! annotation would take — and hands it to a [`TypeChecker`], so generic
//! instantiation correctness (arity, nesting, shadow detection) rides on the
//! host's checking pipeline instead of being re-derived here.
//!
//! [`TableChecker`] is the reference implementation over a plain
//! [`SymbolTable`]. Name components resolve by *name*, not by handle: the
//! first module in load order that uniquely declares the name wins, which is
//! exactly what lets a shadowing declaration win over the intended one — the
//! builder detects that by comparing declaration identity afterwards.

use reify_types::decl::{DeclId, SymbolTable};
use reify_types::ty::Ty;
use tracing::trace;

/// A structural type expression synthesized by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A nominal reference by name, with generic arguments if any.
    Named { name: String, args: Vec<TypeExpr> },
    /// An already-built type passed through unchanged.
    Fixed(Ty),
    /// A nesting path, outermost component first.
    Path(Vec<TypeExpr>),
}

/// The synthetic declaration scope anchoring synthesized expressions.
///
/// Created lazily, at most once per builder session. It exists only so the
/// checker has *somewhere* to stand; it declares nothing itself.
#[derive(Debug)]
pub struct ScratchContext {
    module_name: String,
}

impl ScratchContext {
    pub(crate) fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }
}

/// "Check this synthesized expression in a scratch context."
///
/// Returns the checked type, or `None` when the expression is invalid in
/// the current symbol environment.
pub trait TypeChecker {
    fn check(&self, expr: &TypeExpr, anchor: &ScratchContext) -> Option<Ty>;
}

/// Reference [`TypeChecker`] resolving expressions directly against a
/// [`SymbolTable`].
pub struct TableChecker<'a> {
    symbols: &'a dyn SymbolTable,
}

impl<'a> TableChecker<'a> {
    pub fn new(symbols: &'a dyn SymbolTable) -> Self {
        Self { symbols }
    }

    fn check_expr(&self, expr: &TypeExpr, parent: Option<Ty>) -> Option<Ty> {
        match expr {
            TypeExpr::Fixed(ty) => {
                // A pre-built type cannot be a nesting component.
                if parent.is_some() {
                    return None;
                }
                Some(ty.clone())
            }
            TypeExpr::Named { name, args } => self.check_named(name, args, parent),
            TypeExpr::Path(components) => {
                let mut current = None;
                for component in components {
                    current = Some(self.check_expr(component, current)?);
                }
                current
            }
        }
    }

    fn check_named(&self, name: &str, args: &[TypeExpr], parent: Option<Ty>) -> Option<Ty> {
        let decl = match &parent {
            Some(parent_ty) => {
                let context = parent_ty.nominal_decl()?;
                self.unique_member(context, name)
            }
            None => self.unqualified(name),
        }?;

        // Arity must match the declaration's generic signature exactly.
        if args.len() != self.symbols.generic_params(decl) {
            return None;
        }

        let parent = parent.map(Box::new);
        if args.is_empty() {
            return Some(Ty::Nominal { decl, parent });
        }
        let args = args
            .iter()
            .map(|arg| self.check_expr(arg, None))
            .collect::<Option<Vec<_>>>()?;
        Some(Ty::BoundGeneric { decl, args, parent })
    }

    /// Unqualified top-level lookup: the first module in load order with a
    /// unique nominal of this name wins; an ambiguous module fails outright.
    fn unqualified(&self, name: &str) -> Option<DeclId> {
        for module in self.symbols.modules() {
            let candidates = self.symbols.lookup_member(module, name, None, None);
            match candidates.as_slice() {
                [] => continue,
                [unique] => return Some(*unique),
                _ => return None,
            }
        }
        None
    }

    /// Qualified component lookup: the context must declare the name exactly
    /// once, in any nominal category.
    fn unique_member(&self, context: DeclId, name: &str) -> Option<DeclId> {
        let candidates = self.symbols.lookup_member(context, name, None, None);
        match candidates.as_slice() {
            [unique] => Some(*unique),
            _ => None,
        }
    }
}

impl TypeChecker for TableChecker<'_> {
    fn check(&self, expr: &TypeExpr, anchor: &ScratchContext) -> Option<Ty> {
        trace!(anchor = anchor.module_name(), ?expr, "checking synthesized type");
        self.check_expr(expr, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reify_types::decl::{DeclCategory, DeclTable};

    fn anchor() -> ScratchContext {
        ScratchContext::new(".test")
    }

    #[test]
    fn test_named_resolves_with_arity_validation() {
        let mut table = DeclTable::new();
        let lib = table.add_module("Lib");
        let boxed = table.add_nominal(DeclCategory::Struct, lib, "Box", 1);
        let int = table.add_nominal(DeclCategory::Struct, lib, "Int", 0);
        let checker = TableChecker::new(&table);

        let int_expr = TypeExpr::Named {
            name: "Int".into(),
            args: vec![],
        };
        let applied = TypeExpr::Named {
            name: "Box".into(),
            args: vec![int_expr.clone()],
        };
        let ty = checker.check(&applied, &anchor()).expect("checks");
        assert_eq!(
            ty,
            Ty::BoundGeneric {
                decl: boxed,
                args: vec![Ty::Nominal {
                    decl: int,
                    parent: None
                }],
                parent: None,
            }
        );

        // Wrong arity in either direction is invalid.
        let bare = TypeExpr::Named {
            name: "Box".into(),
            args: vec![],
        };
        assert_eq!(checker.check(&bare, &anchor()), None);
        let over_applied = TypeExpr::Named {
            name: "Int".into(),
            args: vec![int_expr],
        };
        assert_eq!(checker.check(&over_applied, &anchor()), None);
    }

    #[test]
    fn test_load_order_shadows_unqualified_lookup() {
        let mut table = DeclTable::new();
        let first = table.add_module("First");
        let second = table.add_module("Second");
        let shadowing = table.add_nominal(DeclCategory::Struct, first, "Box", 1);
        let _shadowed = table.add_nominal(DeclCategory::Struct, second, "Box", 1);
        let int = table.add_nominal(DeclCategory::Struct, first, "Int", 0);
        let checker = TableChecker::new(&table);

        let expr = TypeExpr::Named {
            name: "Box".into(),
            args: vec![TypeExpr::Fixed(Ty::Nominal {
                decl: int,
                parent: None,
            })],
        };
        let ty = checker.check(&expr, &anchor()).expect("checks");
        assert_eq!(ty.nominal_decl(), Some(shadowing));
    }

    #[test]
    fn test_path_threads_parents() {
        let mut table = DeclTable::new();
        let lib = table.add_module("Lib");
        let outer = table.add_nominal(DeclCategory::Struct, lib, "Outer", 0);
        let inner = table.add_nominal(DeclCategory::Class, outer, "Inner", 1);
        let int = table.add_nominal(DeclCategory::Struct, lib, "Int", 0);
        let checker = TableChecker::new(&table);

        let expr = TypeExpr::Path(vec![
            TypeExpr::Named {
                name: "Outer".into(),
                args: vec![],
            },
            TypeExpr::Named {
                name: "Inner".into(),
                args: vec![TypeExpr::Fixed(Ty::Nominal {
                    decl: int,
                    parent: None,
                })],
            },
        ]);
        let ty = checker.check(&expr, &anchor()).expect("checks");
        assert_eq!(ty.nominal_decl(), Some(inner));
        assert_eq!(
            ty.nominal_parent().and_then(Ty::nominal_decl),
            Some(outer)
        );
    }

    #[test]
    fn test_fixed_cannot_be_a_path_component() {
        let mut table = DeclTable::new();
        let lib = table.add_module("Lib");
        let outer = table.add_nominal(DeclCategory::Struct, lib, "Outer", 0);
        let checker = TableChecker::new(&table);

        let expr = TypeExpr::Path(vec![
            TypeExpr::Named {
                name: "Outer".into(),
                args: vec![],
            },
            TypeExpr::Fixed(Ty::Nominal {
                decl: outer,
                parent: None,
            }),
        ]);
        assert_eq!(checker.check(&expr, &anchor()), None);
    }
}
