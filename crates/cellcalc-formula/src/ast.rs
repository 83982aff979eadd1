//! Formula syntax tree
//!
//! A finished tree is plain owned data: every node owns its children in
//! evaluation order and nothing points back up. The same [`Formula`] can be
//! evaluated any number of times.

use std::fmt;

use crate::error::FormulaResult;

/// Name given to a parenthesized group; evaluates to its single operand
pub const IDENTITY: &str = "IDENTITY";

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Holder of the top-level expression
    Root,
    /// Text literal (already unquoted)
    Literal(String),
    /// Numeric literal
    Number(f64),
    /// Cell or range address as written, e.g. `Discounts!A2:B6`
    Reference(String),
    /// Function call, or [`IDENTITY`] for parentheses
    Call(String),
    /// Infix operator applied to all children
    Operator(String),
}

/// A syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// Call name or operator symbol
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Call(name) | NodeKind::Operator(name) => Some(name),
            _ => None,
        }
    }

    /// Number of children, which is the dispatch arity for calls and operators
    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this is a call of `name` (case-insensitive)
    pub fn is_call(&self, name: &str) -> bool {
        matches!(&self.kind, NodeKind::Call(n) if n.eq_ignore_ascii_case(name))
    }

    /// Depth of the subtree (a leaf is 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }
}

impl fmt::Display for Node {
    /// Compact form: `+{10, *{3, 2}}`, `SUM{A1:A3}`, `"text"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Root => f.write_str("ROOT")?,
            NodeKind::Literal(s) => return write!(f, "{:?}", s),
            NodeKind::Number(n) => return write!(f, "{}", n),
            NodeKind::Reference(addr) => return f.write_str(addr),
            NodeKind::Call(name) | NodeKind::Operator(name) => f.write_str(name)?,
        }
        f.write_str("{")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str("}")
    }
}

/// A parsed formula
///
/// Owns exactly one [`NodeKind::Root`] node, which holds exactly one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    root: Node,
}

impl Formula {
    /// Parse formula text; a leading `=` is optional
    ///
    /// ```rust
    /// use cellcalc_formula::Formula;
    ///
    /// let formula = Formula::parse("=10 + 20 - 29").unwrap();
    /// assert_eq!(formula.entry().to_string(), "-{+{10, 20}, 29}");
    /// ```
    pub fn parse(text: &str) -> FormulaResult<Self> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
        let tokens = crate::tokenizer::tokenize(body)?;
        let root = crate::parser::build(&tokens)?;
        Ok(Self {
            text: trimmed.to_string(),
            root,
        })
    }

    pub(crate) fn from_root(text: String, root: Node) -> Self {
        Self { text, root }
    }

    /// Formula text with its leading `=`
    ///
    /// This is the trimmed source for [`Formula::parse`], and text rebuilt from
    /// the tokens for [`parse_tokens`](crate::parser::parse_tokens).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The top-level expression
    pub fn entry(&self) -> &Node {
        // The builder rejects trees whose root does not hold exactly one child
        &self.root.children[0]
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entry())
    }
}
