//! Symbol-path nodes and the canonical mangling codec.
//!
//! A [`Node`] tree describes a fully-qualified declaration path as produced by
//! a demangler: a nominal declaration wrapped in its enclosing contexts, with
//! the declaration name carried by a dedicated child node. The resolver only
//! ever reads these trees; it never mutates them.
//!
//! ## Mangling grammar
//!
//! The canonical textual encoding is reversible and length-prefixed, so no
//! escaping is needed:
//!
//! ```text
//! type       := 'T' context
//! context    := 'M' name                      -- module
//!             | 'D' context                   -- decl-context wrapper
//!             | 'C' context decl-name         -- class
//!             | 'E' context decl-name         -- enum
//!             | 'P' context decl-name         -- protocol
//!             | 'S' context decl-name         -- structure
//! decl-name  := 'I' name                      -- plain identifier
//!             | 'X' name name                 -- private: discriminator, name
//!             | 'L' digits '_' name           -- local: index, name
//! name       := <decimal byte length><bytes>
//! ```
//!
//! [`mangle`] and [`demangle`] are exact inverses over well-formed trees;
//! [`demangle`] is total and returns `None` for malformed input.

use std::fmt;

/// The kind of a symbol-path node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    DeclContext,
    Type,
    Class,
    Enum,
    Protocol,
    Structure,
    Identifier,
    PrivateDeclName,
    LocalDeclName,
}

impl NodeKind {
    /// Whether this kind names one of the four nominal declaration shapes.
    pub fn is_nominal(self) -> bool {
        matches!(
            self,
            NodeKind::Class | NodeKind::Enum | NodeKind::Protocol | NodeKind::Structure
        )
    }
}

/// An immutable node in a demangled symbol path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    text: String,
    children: Vec<Node>,
}

impl Node {
    /// A module node carrying the module's textual name.
    pub fn module(name: impl Into<String>) -> Node {
        Node {
            kind: NodeKind::Module,
            text: name.into(),
            children: Vec::new(),
        }
    }

    /// A decl-context wrapper around an inner context.
    pub fn decl_context(inner: Node) -> Node {
        Node {
            kind: NodeKind::DeclContext,
            text: String::new(),
            children: vec![inner],
        }
    }

    /// A type wrapper around a context, marking the root of a type path.
    pub fn type_of(inner: Node) -> Node {
        Node {
            kind: NodeKind::Type,
            text: String::new(),
            children: vec![inner],
        }
    }

    /// A nominal node: `kind` must be one of the four nominal kinds, with the
    /// enclosing context as child 0 and the decl-name production as child 1.
    pub fn nominal(kind: NodeKind, context: Node, decl_name: Node) -> Node {
        debug_assert!(kind.is_nominal());
        Node {
            kind,
            text: String::new(),
            children: vec![context, decl_name],
        }
    }

    /// A plain identifier decl-name.
    pub fn identifier(name: impl Into<String>) -> Node {
        Node {
            kind: NodeKind::Identifier,
            text: name.into(),
            children: Vec::new(),
        }
    }

    /// A private decl-name: the discriminator is child 0, the name child 1.
    pub fn private_decl_name(
        discriminator: impl Into<String>,
        name: impl Into<String>,
    ) -> Node {
        Node {
            kind: NodeKind::PrivateDeclName,
            text: String::new(),
            children: vec![Node::identifier(discriminator), Node::identifier(name)],
        }
    }

    /// A local decl-name: the per-context index is child 0, the name child 1.
    pub fn local_decl_name(index: u64, name: impl Into<String>) -> Node {
        Node {
            kind: NodeKind::LocalDeclName,
            text: String::new(),
            children: vec![Node::identifier(index.to_string()), Node::identifier(name)],
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mangle(self))
    }
}

// =============================================================================
// Mangling
// =============================================================================

/// Produce the canonical mangled encoding of a symbol-path node.
pub fn mangle(node: &Node) -> String {
    let mut out = String::new();
    mangle_into(node, &mut out);
    out
}

fn mangle_into(node: &Node, out: &mut String) {
    match node.kind {
        NodeKind::Type => {
            out.push('T');
            if let Some(child) = node.first_child() {
                mangle_into(child, out);
            }
        }
        NodeKind::DeclContext => {
            out.push('D');
            if let Some(child) = node.first_child() {
                mangle_into(child, out);
            }
        }
        NodeKind::Module => {
            out.push('M');
            mangle_name(&node.text, out);
        }
        NodeKind::Class | NodeKind::Enum | NodeKind::Protocol | NodeKind::Structure => {
            out.push(match node.kind {
                NodeKind::Class => 'C',
                NodeKind::Enum => 'E',
                NodeKind::Protocol => 'P',
                _ => 'S',
            });
            if let Some(context) = node.child(0) {
                mangle_into(context, out);
            }
            if let Some(decl_name) = node.child(1) {
                mangle_into(decl_name, out);
            }
        }
        NodeKind::Identifier => {
            out.push('I');
            mangle_name(&node.text, out);
        }
        NodeKind::PrivateDeclName => {
            out.push('X');
            mangle_name(node.child(0).map_or("", Node::text), out);
            mangle_name(node.child(1).map_or("", Node::text), out);
        }
        NodeKind::LocalDeclName => {
            out.push('L');
            out.push_str(node.child(0).map_or("0", Node::text));
            out.push('_');
            mangle_name(node.child(1).map_or("", Node::text), out);
        }
    }
}

fn mangle_name(name: &str, out: &mut String) {
    out.push_str(&name.len().to_string());
    out.push_str(name);
}

// =============================================================================
// Demangling
// =============================================================================

/// Parse a canonical mangled symbol back into a node tree.
///
/// Total over arbitrary input: malformed or trailing text yields `None`.
pub fn demangle(mangled: &str) -> Option<Node> {
    let mut parser = Parser {
        input: mangled,
        pos: 0,
    };
    let node = parser.parse_node()?;
    if parser.pos != parser.input.len() {
        return None;
    }
    Some(node)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn parse_node(&mut self) -> Option<Node> {
        if self.peek() == Some('T') {
            self.bump();
            return Some(Node::type_of(self.parse_context()?));
        }
        self.parse_context()
    }

    fn parse_context(&mut self) -> Option<Node> {
        match self.bump()? {
            'M' => Some(Node::module(self.parse_name()?)),
            'D' => Some(Node::decl_context(self.parse_context()?)),
            letter @ ('C' | 'E' | 'P' | 'S') => {
                let kind = match letter {
                    'C' => NodeKind::Class,
                    'E' => NodeKind::Enum,
                    'P' => NodeKind::Protocol,
                    _ => NodeKind::Structure,
                };
                let context = self.parse_context()?;
                let decl_name = self.parse_decl_name()?;
                Some(Node::nominal(kind, context, decl_name))
            }
            _ => None,
        }
    }

    fn parse_decl_name(&mut self) -> Option<Node> {
        match self.bump()? {
            'I' => Some(Node::identifier(self.parse_name()?)),
            'X' => {
                let discriminator = self.parse_name()?;
                let name = self.parse_name()?;
                Some(Node::private_decl_name(discriminator, name))
            }
            'L' => {
                let index = self.parse_digits()?;
                if self.bump()? != '_' {
                    return None;
                }
                Some(Node::local_decl_name(index, self.parse_name()?))
            }
            _ => None,
        }
    }

    fn parse_digits(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == start {
            return None;
        }
        self.input[start..self.pos].parse().ok()
    }

    fn parse_name(&mut self) -> Option<String> {
        let len = self.parse_digits()? as usize;
        let rest = &self.input[self.pos..];
        if rest.len() < len || !rest.is_char_boundary(len) {
            return None;
        }
        let name = &rest[..len];
        self.pos += len;
        Some(name.to_owned())
    }
}
