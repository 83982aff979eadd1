//! AST builder
//!
//! Turns a flat token stream into a precedence-correct [`Formula`]. Nodes live in
//! an arena and refer to each other by index while the tree is being built; a
//! stack of open node indices stands in for parent pointers. When the stream is
//! exhausted the arena is converted into an owned [`Node`] tree.
//!
//! Infix operators are grown in place. Each open node carries a chain of open
//! operator nodes (outermost first). Operands go to the innermost one; a run of
//! the same symbol keeps extending one n-ary node, so `10+20+30` is a single
//! `+{10, 20, 30}`.
//!
//! When a new operator arrives:
//! - with no chain, it takes the most recent child of the open node as its first operand
//! - with the same symbol as the innermost, nothing changes
//! - with a higher precedence, it takes the last operand of the innermost operator and
//!   nests inside it (`10+3*2` is `+{10, *{3, 2}}`)
//! - otherwise the innermost operator is finished; once only the outermost is left it is
//!   wrapped (`10+20-29` is `-{+{10, 20}, 29}`)

use crate::ast::{Formula, Node, NodeKind, IDENTITY};
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{Token, TokenKind, TokenSubkind};

/// Parse formula text into a [`Formula`]
///
/// # Example
/// ```rust
/// use cellcalc_formula::parse_formula;
///
/// let formula = parse_formula("=(1 - 2 + 3) / 5").unwrap();
/// assert_eq!(formula.entry().to_string(), "/{IDENTITY{+{-{1, 2}, 3}}, 5}");
/// ```
pub fn parse_formula(text: &str) -> FormulaResult<Formula> {
    Formula::parse(text)
}

/// Build a [`Formula`] from an already tokenized stream
///
/// The formula's text is rebuilt from the tokens, so it parses back to the
/// same tree.
pub fn parse_tokens(tokens: &[Token]) -> FormulaResult<Formula> {
    let root = build(tokens)?;
    Ok(Formula::from_root(render(tokens), root))
}

/// Formula text for a token stream, with the leading `=`
fn render(tokens: &[Token]) -> String {
    let mut text = String::from("=");
    for token in tokens {
        match (token.kind, token.subkind) {
            (TokenKind::FunctionStart, _) => {
                text.push_str(&token.text);
                text.push('(');
            }
            (TokenKind::FunctionStop | TokenKind::SubexpressionStop, _) => text.push(')'),
            (TokenKind::SubexpressionStart, _) => text.push('('),
            (TokenKind::Argument, _) => text.push_str(", "),
            (TokenKind::OperatorInfix, _) => {
                text.push(' ');
                text.push_str(&token.text);
                text.push(' ');
            }
            (TokenKind::Operand, TokenSubkind::Text) => {
                text.push('"');
                text.push_str(&token.text.replace('"', "\"\""));
                text.push('"');
            }
            (TokenKind::Operand, _) => text.push_str(&token.text),
        }
    }
    text
}

/// Build the root node from a token stream
pub(crate) fn build(tokens: &[Token]) -> FormulaResult<Node> {
    let mut builder = AstBuilder::new();
    for token in tokens {
        builder.feed(token)?;
    }
    builder.finish()
}

/// Binding strength of an infix symbol; unknown symbols (comparisons) bind loosest
pub fn precedence(symbol: &str) -> u8 {
    match symbol {
        "+" | "-" => 1,
        "*" | "/" => 2,
        _ => 0,
    }
}

/// Most calls and parenthesized groups that may be open at once
pub const MAX_NESTING: usize = 64;

/// Deepest finished tree, counted from the top-level expression
///
/// Alternating operators (`1+2-3+4-...`) deepen the tree without any
/// parentheses, so this is checked separately from [`MAX_NESTING`].
pub const MAX_DEPTH: usize = 128;

const ROOT: usize = 0;

#[derive(Debug)]
struct Slot {
    kind: NodeKind,
    children: Vec<usize>,
    /// Open infix operators, outermost first; only the outermost is a child-to-be
    /// of this slot, each further one already sits inside the previous
    accumulators: Vec<usize>,
}

impl Slot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            accumulators: Vec::new(),
        }
    }

    fn symbol(&self) -> &str {
        match &self.kind {
            NodeKind::Operator(symbol) => symbol,
            _ => "",
        }
    }
}

struct AstBuilder {
    slots: Vec<Slot>,
    /// Currently open slots; the root is always at the bottom
    open: Vec<usize>,
    /// Kind of the previous token, used to reject operands or operators out of place
    previous: Option<TokenKind>,
}

impl AstBuilder {
    fn new() -> Self {
        Self {
            slots: vec![Slot::new(NodeKind::Root)],
            open: vec![ROOT],
            previous: None,
        }
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(ROOT)
    }

    fn feed(&mut self, token: &Token) -> FormulaResult<()> {
        match token.kind {
            TokenKind::FunctionStart => {
                self.expect_operand_position(&token.text)?;
                self.open_call(token.text.clone())?;
            }
            TokenKind::SubexpressionStart => {
                self.expect_operand_position("(")?;
                self.open_call(IDENTITY.to_string())?;
            }
            TokenKind::FunctionStop | TokenKind::SubexpressionStop => self.close_call()?,
            TokenKind::Argument => {
                let current = self.current();
                self.flush(current);
            }
            TokenKind::Operand => {
                self.expect_operand_position(&token.text)?;
                let node = self.operand_node(token)?;
                let id = self.push_slot(node);
                self.attach(id);
            }
            TokenKind::OperatorInfix => self.infix(&token.text)?,
        }
        self.previous = Some(token.kind);
        Ok(())
    }

    fn operand_node(&self, token: &Token) -> FormulaResult<NodeKind> {
        Ok(match token.subkind {
            TokenSubkind::Number => {
                let n = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::Parse(format!("invalid number '{}'", token.text)))?;
                NodeKind::Number(n)
            }
            TokenSubkind::Range => NodeKind::Reference(token.text.clone()),
            TokenSubkind::Text | TokenSubkind::None => NodeKind::Literal(token.text.clone()),
        })
    }

    fn push_slot(&mut self, kind: NodeKind) -> usize {
        self.slots.push(Slot::new(kind));
        self.slots.len() - 1
    }

    /// Append to the innermost open accumulator of the current node, or to the node itself
    fn attach(&mut self, child: usize) {
        let current = self.current();
        let target = self.slots[current]
            .accumulators
            .last()
            .copied()
            .unwrap_or(current);
        self.slots[target].children.push(child);
    }

    /// Close every open accumulator of `owner`, appending the outermost as its next child
    fn flush(&mut self, owner: usize) {
        let accumulators = std::mem::take(&mut self.slots[owner].accumulators);
        if let Some(&outermost) = accumulators.first() {
            self.slots[owner].children.push(outermost);
        }
    }

    fn open_call(&mut self, name: String) -> FormulaResult<()> {
        // The root is always open and does not count
        if self.open.len() > MAX_NESTING {
            return Err(FormulaError::Parse(format!(
                "more than {} nested calls or parentheses",
                MAX_NESTING
            )));
        }
        let id = self.push_slot(NodeKind::Call(name));
        self.attach(id);
        self.open.push(id);
        Ok(())
    }

    fn close_call(&mut self) -> FormulaResult<()> {
        if self.open.len() <= 1 {
            return Err(FormulaError::Parse("unexpected ')'".into()));
        }
        let current = self.current();
        self.flush(current);
        self.open.pop();
        Ok(())
    }

    fn infix(&mut self, symbol: &str) -> FormulaResult<()> {
        if !matches!(
            self.previous,
            Some(TokenKind::Operand | TokenKind::FunctionStop | TokenKind::SubexpressionStop)
        ) {
            return Err(FormulaError::Parse(format!(
                "operator '{}' is missing its left operand",
                symbol
            )));
        }

        let current = self.current();

        if self.slots[current].accumulators.is_empty() {
            let left = self.slots[current].children.pop().ok_or_else(|| {
                FormulaError::Parse(format!("operator '{}' is missing its left operand", symbol))
            })?;
            let op = self.push_slot(NodeKind::Operator(symbol.to_string()));
            self.slots[op].children.push(left);
            self.slots[current].accumulators.push(op);
            return Ok(());
        }

        loop {
            let chain = &self.slots[current].accumulators;
            let depth = chain.len();
            let top = chain[depth - 1];
            let top_symbol = self.slots[top].symbol();

            if top_symbol == symbol {
                return Ok(());
            }

            if precedence(symbol) > precedence(top_symbol) {
                let operand = self.slots[top].children.pop().ok_or_else(|| {
                    FormulaError::Parse(format!(
                        "operator '{}' is missing its left operand",
                        symbol
                    ))
                })?;
                let op = self.push_slot(NodeKind::Operator(symbol.to_string()));
                self.slots[op].children.push(operand);
                self.slots[top].children.push(op);
                self.slots[current].accumulators.push(op);
                return Ok(());
            }

            if depth == 1 {
                let op = self.push_slot(NodeKind::Operator(symbol.to_string()));
                self.slots[op].children.push(top);
                self.slots[current].accumulators[0] = op;
                return Ok(());
            }

            // The innermost run is complete and already sits inside its parent
            self.slots[current].accumulators.pop();
        }
    }

    /// Operands and calls may not directly follow another operand or a closed group
    fn expect_operand_position(&self, what: &str) -> FormulaResult<()> {
        if matches!(
            self.previous,
            Some(TokenKind::Operand | TokenKind::FunctionStop | TokenKind::SubexpressionStop)
        ) {
            return Err(FormulaError::Parse(format!(
                "missing operator before '{}'",
                what
            )));
        }
        Ok(())
    }

    fn finish(mut self) -> FormulaResult<Node> {
        while let Some(id) = self.open.pop() {
            self.flush(id);
        }

        match self.slots[ROOT].children.len() {
            0 => return Err(FormulaError::Parse("empty formula".into())),
            1 => {}
            n => {
                return Err(FormulaError::Parse(format!(
                    "expected one expression, found {}",
                    n
                )))
            }
        }

        let depth = self.entry_depth();
        if depth > MAX_DEPTH {
            return Err(FormulaError::Parse(format!(
                "expression is {} levels deep, the limit is {}",
                depth, MAX_DEPTH
            )));
        }

        self.materialize(ROOT)
    }

    /// Depth of the top-level expression, walked without recursion
    fn entry_depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(usize, usize)> = self.slots[ROOT]
            .children
            .iter()
            .map(|&child| (child, 1))
            .collect();
        while let Some((id, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(self.slots[id].children.iter().map(|&child| (child, depth + 1)));
        }
        deepest
    }

    fn materialize(&mut self, id: usize) -> FormulaResult<Node> {
        let kind = std::mem::replace(&mut self.slots[id].kind, NodeKind::Root);
        let child_ids = std::mem::take(&mut self.slots[id].children);

        if let NodeKind::Operator(symbol) = &kind {
            if child_ids.len() < 2 {
                return Err(FormulaError::Parse(format!(
                    "operator '{}' is missing an operand",
                    symbol
                )));
            }
        }

        let children = child_ids
            .into_iter()
            .map(|child| self.materialize(child))
            .collect::<FormulaResult<Vec<_>>>()?;
        Ok(Node::with_children(kind, children))
    }
}
