//! Formula evaluator
//!
//! A depth-first walk over the syntax tree. Every call and operator node pushes
//! the values of its children onto an operand stack, then a single dispatch pops
//! exactly that many operands and pushes one result, which is moved into the
//! frame's result register. Literals and references go straight to the register.
//!
//! `IF`, `TRUE()` and `FALSE()` are control flow and never touch the stack; only
//! the selected branch of an `IF` is evaluated.
//!
//! Each evaluated formula gets its own [`Frame`]. A reference to a cell holding
//! a formula evaluates that formula in a fresh frame, in the sheet of the cell.
//! A per-call [`Session`] tracks the cells currently being resolved so that a
//! cycle becomes an error value instead of unbounded recursion.

use ahash::{AHashMap, AHashSet};
use tracing::{debug, error, trace, warn};

use crate::ast::{Formula, Node, NodeKind, IDENTITY};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{self, FunctionLibrary, FunctionRegistry};
use crate::resolver::{RawCell, Resolver};
use crate::value::{is_truthy, ErrorKind, Value};

/// Engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Deepest chain of formula cells referencing formula cells
    pub max_depth: usize,
    /// Most call and operator nodes under evaluation at once, summed over every
    /// formula in a reference chain
    pub max_nesting: usize,
    /// Evaluate each formula cell at most once per top-level call
    pub memoize: bool,
    /// Sheet for unqualified addresses; the resolver's default when `None`
    pub default_sheet: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nesting: 512,
            memoize: false,
            default_sheet: None,
        }
    }
}

/// One pending dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Invoke<'n> {
    name: &'n str,
    arity: u8,
}

/// LIFO of operand values
#[derive(Debug, Default)]
pub(crate) struct OperandStack {
    values: Vec<Value>,
}

impl OperandStack {
    pub(crate) fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub(crate) fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    /// Pop `n` values, returned in the order they were pushed
    pub(crate) fn pop_n(&mut self, n: usize) -> Option<Vec<Value>> {
        let start = self.values.len().checked_sub(n)?;
        Some(self.values.split_off(start))
    }

    pub(crate) fn height(&self) -> usize {
        self.values.len()
    }

    fn truncate(&mut self, height: usize) {
        self.values.truncate(height);
    }
}

/// State of one formula being evaluated
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) stack: OperandStack,
    /// Value of the most recently evaluated node
    pub(crate) register: Option<Value>,
    /// Sheet for unqualified addresses
    pub(crate) sheet: String,
}

impl Frame {
    pub(crate) fn new(sheet: &str) -> Self {
        Self {
            stack: OperandStack::default(),
            register: None,
            sheet: sheet.to_string(),
        }
    }

    fn take_register(&mut self) -> Value {
        self.register
            .take()
            .unwrap_or_else(|| Value::error(ErrorKind::NotAvailable, "no value was produced"))
    }
}

/// State shared by all frames of one top-level call
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// `Sheet!A1` of every formula cell currently being evaluated
    resolving: AHashSet<String>,
    memo: AHashMap<String, Value>,
    depth: usize,
    /// Call and operator nodes currently being evaluated, across frames
    nesting: usize,
}

/// Evaluates formulas against a [`Resolver`] and a [`FunctionLibrary`]
///
/// # Example
/// ```rust
/// use cellcalc_core::Workbook;
/// use cellcalc_formula::{Engine, Formula, Resolver, Value};
///
/// let mut workbook = Workbook::new();
/// workbook.set_cell("A1", "Sheet1", "4").unwrap();
///
/// let engine = Engine::new(&workbook);
/// let formula = Formula::parse("=A1 * (2 + 1)").unwrap();
/// assert_eq!(engine.evaluate(&formula).unwrap(), Value::Number(12.0));
/// ```
pub struct Engine<'a, R: Resolver + ?Sized, L: FunctionLibrary + ?Sized = FunctionRegistry> {
    resolver: &'a R,
    library: &'a L,
    options: EngineOptions,
}

impl<'a, R: Resolver + ?Sized> Engine<'a, R, FunctionRegistry> {
    /// Engine using the built-in functions
    pub fn new(resolver: &'a R) -> Self {
        Self::with_library(resolver, functions::builtin())
    }
}

impl<'a, R: Resolver + ?Sized, L: FunctionLibrary + ?Sized> Engine<'a, R, L> {
    pub fn with_library(resolver: &'a R, library: &'a L) -> Self {
        Self {
            resolver,
            library,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Sheet used when the caller does not name one
    pub fn context_sheet(&self) -> String {
        self.options
            .default_sheet
            .clone()
            .unwrap_or_else(|| self.resolver.default_sheet())
    }

    /// Evaluate a formula in the default sheet context
    ///
    /// Only an unknown function aborts; every other problem comes back as a
    /// [`Value::Error`].
    pub fn evaluate(&self, formula: &Formula) -> FormulaResult<Value> {
        let sheet = self.context_sheet();
        self.evaluate_in(formula, &sheet)
    }

    /// Evaluate a formula with unqualified addresses resolved against `sheet`
    pub fn evaluate_in(&self, formula: &Formula, sheet: &str) -> FormulaResult<Value> {
        debug!(formula = formula.text(), sheet, "evaluating formula");
        self.evaluate_node(formula.entry(), sheet)
    }

    /// Evaluate any subtree
    pub fn evaluate_node(&self, node: &Node, sheet: &str) -> FormulaResult<Value> {
        let mut session = Session::default();
        let mut frame = Frame::new(sheet);
        self.eval(node, &mut frame, &mut session)?;
        Ok(frame.take_register())
    }

    /// Parse and evaluate formula text
    pub fn evaluate_text(&self, text: &str, sheet: &str) -> FormulaResult<Value> {
        let formula = Formula::parse(text)?;
        self.evaluate_in(&formula, sheet)
    }

    /// Value of the cell at `address`
    ///
    /// Formula cells are evaluated, literal cells are coerced. An address that
    /// cannot be read is an `Err`.
    pub fn evaluate_cell(&self, address: &str, sheet: &str) -> FormulaResult<Value> {
        debug!(address, sheet, "evaluating cell");
        let cell = self.resolver.get_cell(address, sheet)?;
        let mut session = Session::default();
        Ok(self.cell_value(&cell, &mut session))
    }

    pub(crate) fn eval(
        &self,
        node: &Node,
        frame: &mut Frame,
        session: &mut Session,
    ) -> FormulaResult<()> {
        if node.is_leaf() {
            return self.eval_kind(node, frame, session);
        }
        if session.nesting >= self.options.max_nesting {
            warn!(max_nesting = self.options.max_nesting, "expression nested too deeply");
            frame.register = Some(Value::error(
                ErrorKind::RecursionLimit,
                format!(
                    "more than {} nested calls and operators",
                    self.options.max_nesting
                ),
            ));
            return Ok(());
        }
        session.nesting += 1;
        let outcome = self.eval_kind(node, frame, session);
        session.nesting -= 1;
        outcome
    }

    fn eval_kind(
        &self,
        node: &Node,
        frame: &mut Frame,
        session: &mut Session,
    ) -> FormulaResult<()> {
        let value = match &node.kind {
            NodeKind::Number(n) => Value::Number(*n),
            NodeKind::Literal(s) => Value::Text(s.clone()),
            NodeKind::Reference(address) => {
                let sheet = frame.sheet.clone();
                self.dereference(address, &sheet, session)
            }
            NodeKind::Root => match node.children.first() {
                Some(entry) => return self.eval(entry, frame, session),
                None => Value::error(ErrorKind::NotAvailable, "empty formula"),
            },
            NodeKind::Call(name) if node.is_leaf() && name.eq_ignore_ascii_case("TRUE") => {
                Value::Boolean(true)
            }
            NodeKind::Call(name) if node.is_leaf() && name.eq_ignore_ascii_case("FALSE") => {
                Value::Boolean(false)
            }
            NodeKind::Call(name) if name.eq_ignore_ascii_case("IF") => {
                return self.eval_if(node, frame, session);
            }
            NodeKind::Call(name) => {
                // Checked before any argument is evaluated
                if name != IDENTITY && !self.library.exists(name) {
                    return Err(FormulaError::UnknownFunction(name.clone()));
                }
                self.dispatch(name, node, frame, session)?
            }
            NodeKind::Operator(symbol) => self.dispatch(symbol, node, frame, session)?,
        };
        frame.register = Some(value);
        Ok(())
    }

    fn eval_if(&self, node: &Node, frame: &mut Frame, session: &mut Session) -> FormulaResult<()> {
        let (condition, arity) = match node.children.first() {
            Some(condition) if node.arity() <= 3 => (condition, node.arity()),
            _ => {
                frame.register = Some(Value::error(
                    ErrorKind::InvalidOperation,
                    format!("IF takes 1 to 3 arguments, got {}", node.arity()),
                ));
                return Ok(());
            }
        };

        self.eval(condition, frame, session)?;
        let branch = if is_truthy(frame.register.as_ref()) {
            node.children.get(1)
        } else {
            node.children.get(2)
        };
        trace!(arity, taken = branch.is_some(), "IF");

        match branch {
            Some(branch) => self.eval(branch, frame, session),
            None => {
                frame.register = Some(Value::Boolean(false));
                Ok(())
            }
        }
    }

    /// Push every child, run the operation, pop its result
    fn dispatch(
        &self,
        name: &str,
        node: &Node,
        frame: &mut Frame,
        session: &mut Session,
    ) -> FormulaResult<Value> {
        let Ok(arity) = u8::try_from(node.arity()) else {
            return Ok(Value::error(
                ErrorKind::InvalidOperation,
                format!("{} has more than {} operands", name, u8::MAX),
            ));
        };
        let invoke = Invoke { name, arity };

        let height = frame.stack.height();
        for child in &node.children {
            self.eval(child, frame, session)?;
            let value = frame.take_register();
            frame.stack.push(value);
        }

        trace!(name = invoke.name, arity = invoke.arity, "dispatch");
        self.run_stack(invoke, &mut frame.stack);

        let result = frame.stack.pop();
        let after = frame.stack.height();
        debug_assert_eq!(after, height, "operand stack unbalanced after {}", name);
        match result {
            Some(value) if after == height => Ok(value),
            _ => {
                error!(
                    name,
                    before = height,
                    after,
                    "operand stack unbalanced after dispatch"
                );
                frame.stack.truncate(height);
                Ok(Value::error(
                    ErrorKind::InternalStackImbalance,
                    format!("operand stack unbalanced after {}", name),
                ))
            }
        }
    }

    /// Pop `arity` operands, compute, push exactly one result
    fn run_stack(&self, invoke: Invoke<'_>, stack: &mut OperandStack) {
        let Some(operands) = stack.pop_n(usize::from(invoke.arity)) else {
            stack.push(Value::error(
                ErrorKind::InternalStackImbalance,
                format!("{} needs {} operands", invoke.name, invoke.arity),
            ));
            return;
        };

        let result = match invoke.name {
            IDENTITY => identity(operands),
            "+" | "-" | "*" | "/" => arithmetic(invoke.name, &operands),
            ">" | "<" | "=" | ">=" | "<=" | "<>" => compare(invoke.name, &operands),
            name => match self.library.call(name, &operands) {
                Ok(value) => value,
                Err(err) => Value::error(ErrorKind::FunctionFailed, err.to_string()),
            },
        };
        stack.push(result);
    }

    fn dereference(&self, address: &str, sheet: &str, session: &mut Session) -> Value {
        debug!(address, sheet, "dereference");

        if !address.contains(':') {
            return match self.resolver.get_cell(address, sheet) {
                Ok(cell) => self.cell_value(&cell, session),
                Err(err) => {
                    warn!(address, sheet, error = %err, "cannot resolve cell");
                    Value::error(err.kind(), err.to_string())
                }
            };
        }

        let range = match self.resolver.get_range(address, sheet) {
            Ok(range) => range,
            Err(err) => {
                warn!(address, sheet, error = %err, "cannot resolve range");
                return Value::error(err.kind(), err.to_string());
            }
        };

        let values: Vec<Value> = range
            .cells
            .iter()
            .map(|cell| self.cell_value(cell, session))
            .collect();

        if (range.row_count == 1) != (range.col_count == 1)
            && range.row_count.max(range.col_count) > 1
        {
            Value::List(values)
        } else {
            Value::Matrix(
                values
                    .chunks(range.col_count.max(1))
                    .map(<[Value]>::to_vec)
                    .collect(),
            )
        }
    }

    /// Literal cells are coerced; formula cells are evaluated in a fresh frame
    fn cell_value(&self, cell: &RawCell, session: &mut Session) -> Value {
        let Some(text) = &cell.formula else {
            return Value::from_raw(&cell.value);
        };

        let key = cell.qualified_address();
        if let Some(value) = session.memo.get(&key) {
            return value.clone();
        }
        if session.resolving.contains(&key) {
            warn!(cell = %key, "circular reference");
            return Value::error(
                ErrorKind::CircularReference,
                format!("{} depends on itself", key),
            );
        }
        if session.depth >= self.options.max_depth {
            warn!(cell = %key, max_depth = self.options.max_depth, "reference chain too deep");
            return Value::error(
                ErrorKind::RecursionLimit,
                format!(
                    "{} is more than {} formula references deep",
                    key, self.options.max_depth
                ),
            );
        }

        let formula = match Formula::parse(text) {
            Ok(formula) => formula,
            Err(err) => {
                return Value::error(ErrorKind::InvalidFormula, format!("{}: {}", key, err))
            }
        };

        debug!(cell = %key, formula = formula.text(), "evaluating referenced formula");
        session.resolving.insert(key.clone());
        session.depth += 1;

        let mut frame = Frame::new(&cell.sheet);
        let outcome = self
            .eval(formula.entry(), &mut frame, session)
            .map(|()| frame.take_register());

        session.depth -= 1;
        session.resolving.remove(&key);

        let value = outcome.unwrap_or_else(|err| Value::error(err.kind(), err.to_string()));
        if self.options.memoize {
            session.memo.insert(key, value.clone());
        }
        value
    }
}

fn identity(mut operands: Vec<Value>) -> Value {
    match operands.len() {
        1 => operands.pop().unwrap_or_else(Value::not_available),
        n => Value::error(
            ErrorKind::InvalidOperation,
            format!("parentheses must hold exactly one expression, found {}", n),
        ),
    }
}

/// `+` and `*` fold over all operands; `-` and `/` apply the fold of the rest to the first
fn arithmetic(symbol: &str, operands: &[Value]) -> Value {
    if let Some(err) = operands.iter().find(|v| v.is_error()) {
        return err.clone();
    }

    let mut numbers = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand.as_number() {
            Some(n) => numbers.push(n),
            None => {
                return Value::error(
                    ErrorKind::InvalidOperation,
                    format!("cannot apply '{}' to {}", symbol, operand.type_name()),
                )
            }
        }
    }

    let Some((&first, rest)) = numbers.split_first() else {
        return Value::error(
            ErrorKind::InvalidOperation,
            format!("'{}' has no operands", symbol),
        );
    };

    match symbol {
        "+" => Value::Number(numbers.iter().sum()),
        "*" => Value::Number(numbers.iter().product()),
        "-" => Value::Number(first - rest.iter().sum::<f64>()),
        _ => {
            if rest.is_empty() {
                return Value::Number(first);
            }
            let divisor: f64 = rest.iter().product();
            if divisor == 0.0 {
                Value::error(ErrorKind::DivisionByZero, "division by zero")
            } else {
                Value::Number(first / divisor)
            }
        }
    }
}

fn compare(symbol: &str, operands: &[Value]) -> Value {
    let [a, b] = operands else {
        return Value::error(
            ErrorKind::InvalidOperation,
            format!(
                "'{}' compares exactly two operands, found {}",
                symbol,
                operands.len()
            ),
        );
    };

    for operand in [a, b] {
        if operand.is_error() {
            return operand.clone();
        }
    }

    let ordering = match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Text(x), Value::Text(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        _ => {
            return Value::error(
                ErrorKind::InvalidOperation,
                format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                ),
            )
        }
    };

    let Some(ordering) = ordering else {
        return Value::error(ErrorKind::InvalidOperation, "cannot compare NaN");
    };

    let result = match symbol {
        ">" => ordering.is_gt(),
        "<" => ordering.is_lt(),
        "=" => ordering.is_eq(),
        ">=" => ordering.is_ge(),
        "<=" => ordering.is_le(),
        _ => ordering.is_ne(),
    };
    Value::Boolean(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::resolver::RawRange;
    use cellcalc_core::Workbook;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;

    fn eval(formula: &str) -> FormulaResult<Value> {
        let wb = Workbook::new();
        Engine::new(&wb).evaluate_text(formula, "Sheet1")
    }

    fn eval_in(wb: &Workbook, formula: &str) -> Value {
        Engine::new(wb).evaluate_text(formula, "Sheet1").unwrap()
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    fn kind(value: FormulaResult<Value>) -> Option<ErrorKind> {
        value.unwrap().error_kind()
    }

    /// Workbook wrapper that records every cell read
    struct Recording {
        workbook: Workbook,
        reads: RefCell<Vec<String>>,
    }

    impl Resolver for Recording {
        fn default_sheet(&self) -> String {
            self.workbook.default_sheet()
        }

        fn get_cell(&self, address: &str, sheet: &str) -> Result<RawCell, ResolveError> {
            self.reads.borrow_mut().push(address.to_string());
            self.workbook.get_cell(address, sheet)
        }

        fn get_range(&self, address: &str, sheet: &str) -> Result<RawRange, ResolveError> {
            self.reads.borrow_mut().push(address.to_string());
            self.workbook.get_range(address, sheet)
        }

        fn set_cell(&mut self, address: &str, sheet: &str, raw: &str) -> Result<(), ResolveError> {
            self.workbook.set_cell(address, sheet, raw)
        }
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=10+20-29"), Ok(n(1.0)));
        assert_eq!(eval("=20-29+10"), Ok(n(1.0)));
        assert_eq!(eval("=10+3*2"), Ok(n(16.0)));
        assert_eq!(eval("=10+3/2"), Ok(n(11.5)));
        assert_eq!(eval("=10+20+30-1"), Ok(n(59.0)));
        assert_eq!(eval("=10-1-2+20+30"), Ok(n(57.0)));
        assert_eq!(eval("=2*(5-1)"), Ok(n(8.0)));
        assert_eq!(eval("=(5-1)/2"), Ok(n(2.0)));
        assert_eq!(eval("=(1 - 2 + 3) / 5"), Ok(n(0.4)));
        assert_eq!(eval("=100/5/2"), Ok(n(10.0)));
        assert_eq!(eval("=-3*-2"), Ok(n(6.0)));
    }

    #[test]
    fn test_evaluate_arithmetic_errors() {
        assert_eq!(kind(eval("=1/0")), Some(ErrorKind::DivisionByZero));
        assert_eq!(kind(eval("=1/(2-2)")), Some(ErrorKind::DivisionByZero));
        assert_eq!(kind(eval(r#"=1+"x""#)), Some(ErrorKind::InvalidOperation));
        // Leftmost error wins
        assert_eq!(kind(eval(r#"=(1/0)+"x""#)), Some(ErrorKind::DivisionByZero));
        // Booleans count as 1 and 0
        assert_eq!(eval("=TRUE()+TRUE()"), Ok(n(2.0)));
        assert_eq!(eval("=5*FALSE"), Ok(n(0.0)));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("=5>1"), Ok(Value::Boolean(true)));
        assert_eq!(eval("=5<=1"), Ok(Value::Boolean(false)));
        assert_eq!(eval("=2>=2"), Ok(Value::Boolean(true)));
        assert_eq!(eval("=1+1=2"), Ok(Value::Boolean(true)));
        assert_eq!(eval("=1<>2"), Ok(Value::Boolean(true)));
        assert_eq!(eval(r#"="hello"="hello""#), Ok(Value::Boolean(true)));
        // Ordinal, so upper case sorts first
        assert_eq!(eval(r#"="B"<"a""#), Ok(Value::Boolean(true)));
        assert_eq!(eval("=TRUE()>FALSE()"), Ok(Value::Boolean(true)));
        assert_eq!(kind(eval(r#"=1="1""#)), Some(ErrorKind::InvalidOperation));
        assert_eq!(kind(eval("=1<2<3")), Some(ErrorKind::InvalidOperation));
        assert_eq!(kind(eval("=(1/0)>1")), Some(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_evaluate_if() {
        assert_eq!(eval("=IF(TRUE(),2)"), Ok(n(2.0)));
        assert_eq!(eval("=IF(FALSE(),2)"), Ok(Value::Boolean(false)));
        assert_eq!(eval("=IF(IF(TRUE(),0,2),20,10)"), Ok(n(10.0)));
        assert_eq!(eval("=IF(1,2)"), Ok(n(2.0)));
        assert_eq!(eval("=IF(0,2)"), Ok(Value::Boolean(false)));
        assert_eq!(eval(r#"=IF("FALSE",2,3)"#), Ok(n(3.0)));
        assert_eq!(eval(r#"=IF("false",2,3)"#), Ok(n(2.0)));
        assert_eq!(eval("=IF(1/0,2,3)"), Ok(n(3.0)));
        assert_eq!(eval("=IF(OR(1,0),TRUE())"), Ok(Value::Boolean(true)));
        assert_eq!(eval("=IF(AND(1,3),TRUE())"), Ok(Value::Boolean(true)));
        assert_eq!(kind(eval("=IF(1,2,3,4)")), Some(ErrorKind::InvalidOperation));
    }

    #[test]
    fn test_if_short_circuits() {
        // The untaken branch is never dispatched, so its unknown name is never seen
        assert_eq!(eval("=IF(TRUE(),1,NOPE(2))"), Ok(n(1.0)));

        let rec = Recording {
            workbook: Workbook::new(),
            reads: RefCell::new(Vec::new()),
        };
        let value = Engine::new(&rec).evaluate_text("=IF(0,A1,B1)", "Sheet1");
        assert_eq!(value, Ok(Value::from("")));
        assert_eq!(*rec.reads.borrow(), vec!["B1".to_string()]);
    }

    #[test]
    fn test_unknown_function_fails_before_arguments() {
        let rec = Recording {
            workbook: Workbook::new(),
            reads: RefCell::new(Vec::new()),
        };
        let result = Engine::new(&rec).evaluate_text("=NOPE(A1, B2)", "Sheet1");
        assert_eq!(result, Err(FormulaError::UnknownFunction("NOPE".into())));
        assert!(rec.reads.borrow().is_empty());

        assert_eq!(
            eval("=1+NOPE()"),
            Err(FormulaError::UnknownFunction("NOPE".into()))
        );
    }

    #[test]
    fn test_evaluate_functions() {
        assert_eq!(eval("=FLOOR(10.1)"), Ok(n(10.0)));
        assert_eq!(eval("=POWER(2,3)"), Ok(n(8.0)));
        assert_eq!(eval("=SUM(1,2,3)+SUM(4)"), Ok(n(10.0)));
        assert_eq!(eval("=ROUND(2.5)"), Ok(n(3.0)));
        assert_eq!(eval(r#"=IFERROR(1/0,"none")"#), Ok(Value::from("none")));
        assert_eq!(
            eval("=POWER(2)").unwrap().error_kind(),
            Some(ErrorKind::FunctionFailed)
        );
        assert_eq!(
            eval("=sum(1,2)"),
            Ok(n(3.0)),
            "function names are case-insensitive"
        );
    }

    #[test]
    fn test_identity_arity() {
        let node = Node::with_children(
            NodeKind::Call(IDENTITY.into()),
            vec![Node::new(NodeKind::Number(1.0)), Node::new(NodeKind::Number(2.0))],
        );
        let wb = Workbook::new();
        let value = Engine::new(&wb).evaluate_node(&node, "Sheet1").unwrap();
        assert_eq!(value.error_kind(), Some(ErrorKind::InvalidOperation));

        let empty = Node::new(NodeKind::Call(IDENTITY.into()));
        let value = Engine::new(&wb).evaluate_node(&empty, "Sheet1").unwrap();
        assert_eq!(value.error_kind(), Some(ErrorKind::InvalidOperation));
    }

    fn fixture() -> Workbook {
        let mut wb = Workbook::with_sheets(["Sheet1", "Data"]).unwrap();
        for (address, raw) in [
            ("A1", "1"),
            ("A2", "2"),
            ("A3", "3"),
            ("B1", "10"),
            ("B2", "20"),
            ("B3", "30"),
            ("C1", "Cheap"),
            ("D1", "=A1+B1"),
            ("D2", "=D1*2"),
        ] {
            wb.set_cell(address, "Sheet1", raw).unwrap();
        }
        wb.set_cell("A1", "Data", "100").unwrap();
        wb.set_cell("A2", "Data", "=A1+1").unwrap();
        wb
    }

    #[test]
    fn test_references() {
        let wb = fixture();
        assert_eq!(eval_in(&wb, "=A1+B2"), n(21.0));
        assert_eq!(eval_in(&wb, "=C1"), Value::from("Cheap"));
        assert_eq!(eval_in(&wb, "=Z9"), Value::from(""));
        assert_eq!(eval_in(&wb, "=D2"), n(22.0));
        assert_eq!(eval_in(&wb, "=$A$3*2"), n(6.0));
        // A referenced formula resolves unqualified addresses in its own sheet
        assert_eq!(eval_in(&wb, "=Data!A2"), n(101.0));
    }

    #[test]
    fn test_range_shapes() {
        let wb = fixture();
        assert_eq!(
            eval_in(&wb, "=SUM(A1:A3)"),
            n(6.0)
        );
        let engine = Engine::new(&wb);
        let node = Node::new(NodeKind::Reference("A1:A3".into()));
        assert_eq!(
            engine.evaluate_node(&node, "Sheet1").unwrap(),
            Value::List(vec![n(1.0), n(2.0), n(3.0)])
        );
        let node = Node::new(NodeKind::Reference("A1:C1".into()));
        assert_eq!(
            engine.evaluate_node(&node, "Sheet1").unwrap(),
            Value::List(vec![n(1.0), n(10.0), Value::from("Cheap")])
        );
        let node = Node::new(NodeKind::Reference("A1:B2".into()));
        assert_eq!(
            engine.evaluate_node(&node, "Sheet1").unwrap(),
            Value::Matrix(vec![vec![n(1.0), n(10.0)], vec![n(2.0), n(20.0)]])
        );
        let node = Node::new(NodeKind::Reference("A1:A1".into()));
        assert_eq!(
            engine.evaluate_node(&node, "Sheet1").unwrap(),
            Value::Matrix(vec![vec![n(1.0)]])
        );
        // Formula cells inside a range are evaluated
        let node = Node::new(NodeKind::Reference("D1:D2".into()));
        assert_eq!(
            engine.evaluate_node(&node, "Sheet1").unwrap(),
            Value::List(vec![n(11.0), n(22.0)])
        );
    }

    #[test]
    fn test_unresolvable_references_are_values() {
        let wb = fixture();
        assert_eq!(
            eval_in(&wb, "=Nowhere!A1").error_kind(),
            Some(ErrorKind::AddressNotFound)
        );
        assert_eq!(
            eval_in(&wb, "=A1:B2:C3").error_kind(),
            Some(ErrorKind::InvalidAddress)
        );
        assert_eq!(
            eval_in(&wb, r#"=IFERROR(Nowhere!A1, "missing")"#),
            Value::from("missing")
        );
    }

    #[test]
    fn test_cycles_and_depth() {
        let mut wb = Workbook::new();
        wb.set_cell("A1", "Sheet1", "=B1").unwrap();
        wb.set_cell("B1", "Sheet1", "=A1").unwrap();
        wb.set_cell("C1", "Sheet1", "=C1+1").unwrap();
        assert_eq!(
            eval_in(&wb, "=A1").error_kind(),
            Some(ErrorKind::CircularReference)
        );
        assert_eq!(
            eval_in(&wb, "=C1").error_kind(),
            Some(ErrorKind::CircularReference)
        );

        let mut chain = Workbook::new();
        for row in 1..=5 {
            chain
                .set_cell(&format!("A{}", row), "Sheet1", &format!("=A{}+1", row + 1))
                .unwrap();
        }
        chain.set_cell("A6", "Sheet1", "0").unwrap();
        let engine = Engine::new(&chain);
        assert_eq!(engine.evaluate_text("=A1", "Sheet1"), Ok(n(5.0)));

        let shallow = Engine::new(&chain).with_options(EngineOptions {
            max_depth: 3,
            ..EngineOptions::default()
        });
        assert_eq!(
            shallow
                .evaluate_text("=A1", "Sheet1")
                .unwrap()
                .error_kind(),
            Some(ErrorKind::RecursionLimit)
        );
    }

    #[test]
    fn test_nesting_limit() {
        let wb = Workbook::new();
        let narrow = Engine::new(&wb).with_options(EngineOptions {
            max_nesting: 3,
            ..EngineOptions::default()
        });
        assert_eq!(narrow.evaluate_text("=(((1)))", "Sheet1"), Ok(n(1.0)));
        assert_eq!(
            narrow
                .evaluate_text("=((((1))))", "Sheet1")
                .unwrap()
                .error_kind(),
            Some(ErrorKind::RecursionLimit)
        );

        // Hand-built trees skip the parser's limits
        let mut node = Node::new(NodeKind::Number(1.0));
        for _ in 0..2_000 {
            node = Node::with_children(NodeKind::Call(IDENTITY.into()), vec![node]);
        }
        assert_eq!(
            Engine::new(&wb)
                .evaluate_node(&node, "Sheet1")
                .unwrap()
                .error_kind(),
            Some(ErrorKind::RecursionLimit)
        );

        // The budget is shared along a chain of referenced formulas
        let mut chain = Workbook::new();
        for row in 1..=4 {
            chain
                .set_cell(&format!("A{}", row), "Sheet1", &format!("=((A{}))", row + 1))
                .unwrap();
        }
        chain.set_cell("A5", "Sheet1", "7").unwrap();
        let engine = Engine::new(&chain).with_options(EngineOptions {
            max_nesting: 6,
            ..EngineOptions::default()
        });
        assert_eq!(
            engine.evaluate_text("=A1", "Sheet1").unwrap().error_kind(),
            Some(ErrorKind::RecursionLimit)
        );
        assert_eq!(Engine::new(&chain).evaluate_text("=A1", "Sheet1"), Ok(n(7.0)));
    }

    #[test]
    fn test_nested_formula_failures() {
        let mut wb = Workbook::new();
        wb.set_cell("A1", "Sheet1", "=1+").unwrap();
        wb.set_cell("A2", "Sheet1", "=NOPE(1)").unwrap();
        assert_eq!(
            eval_in(&wb, "=A1").error_kind(),
            Some(ErrorKind::InvalidFormula)
        );
        assert_eq!(
            eval_in(&wb, "=A2").error_kind(),
            Some(ErrorKind::NameNotFound)
        );
    }

    #[test]
    fn test_memoize() {
        let mut workbook = Workbook::new();
        workbook.set_cell("A1", "Sheet1", "=B1+B1").unwrap();
        workbook.set_cell("B1", "Sheet1", "=C1").unwrap();
        workbook.set_cell("C1", "Sheet1", "2").unwrap();
        let rec = Recording {
            workbook,
            reads: RefCell::new(Vec::new()),
        };

        let plain = Engine::new(&rec);
        assert_eq!(plain.evaluate_text("=A1", "Sheet1"), Ok(n(4.0)));
        let c1_reads = rec.reads.borrow().iter().filter(|a| *a == "C1").count();
        assert_eq!(c1_reads, 2);

        rec.reads.borrow_mut().clear();
        let memo = Engine::new(&rec).with_options(EngineOptions {
            memoize: true,
            ..EngineOptions::default()
        });
        assert_eq!(memo.evaluate_text("=A1", "Sheet1"), Ok(n(4.0)));
        let c1_reads = rec.reads.borrow().iter().filter(|a| *a == "C1").count();
        assert_eq!(c1_reads, 1);
    }

    #[test]
    fn test_evaluate_cell() {
        let wb = fixture();
        let engine = Engine::new(&wb);
        assert_eq!(engine.evaluate_cell("D2", "Sheet1"), Ok(n(22.0)));
        assert_eq!(engine.evaluate_cell("Data!A1", "Sheet1"), Ok(n(100.0)));
        assert!(matches!(
            engine.evaluate_cell("Nowhere!A1", "Sheet1"),
            Err(FormulaError::Resolve(ResolveError::AddressNotFound(_)))
        ));
    }

    #[test]
    fn test_default_sheet_context() {
        let wb = fixture();
        let formula = Formula::parse("=A1").unwrap();
        assert_eq!(Engine::new(&wb).evaluate(&formula), Ok(n(1.0)));

        let data = Engine::new(&wb).with_options(EngineOptions {
            default_sheet: Some("Data".into()),
            ..EngineOptions::default()
        });
        assert_eq!(data.context_sheet(), "Data");
        assert_eq!(data.evaluate(&formula), Ok(n(100.0)));
    }

    #[test]
    fn test_idempotent() {
        let wb = fixture();
        let engine = Engine::new(&wb);
        let formula = Formula::parse("=SUM(A1:B3)*D2-IF(C1=\"Cheap\",1,0)").unwrap();
        let first = engine.evaluate(&formula);
        let second = engine.evaluate(&formula);
        assert_eq!(first, Ok(n(1451.0)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_stack_underflow() {
        let wb = Workbook::new();
        let engine = Engine::new(&wb);
        let mut stack = OperandStack::default();
        stack.push(n(1.0));
        engine.run_stack(Invoke { name: "+", arity: 2 }, &mut stack);
        // The short stack is left alone and the error lands on top
        assert_eq!(stack.height(), 2);
        assert_eq!(
            stack.pop().and_then(|v| v.error_kind()),
            Some(ErrorKind::InternalStackImbalance)
        );
    }

    #[test]
    fn test_stack_balance_per_node() {
        let wb = fixture();
        let engine = Engine::new(&wb);
        for text in [
            "=1",
            "=A1",
            "=A1:B2",
            "=TRUE()",
            "=IF(A1>0, SUM(A1:A3), 0)",
            "=(1 - 2 + 3) / 5",
            "=VLOOKUP(2, A1:B3, 2, 0) + D2",
            "=1<2<3",
        ] {
            let formula = Formula::parse(text).unwrap();
            let mut frame = Frame::new("Sheet1");
            frame.stack.push(Value::from("sentinel"));
            let mut session = Session::default();
            engine
                .eval(formula.entry(), &mut frame, &mut session)
                .unwrap();
            assert_eq!(frame.stack.height(), 1, "{}", text);
            assert!(frame.register.is_some(), "{}", text);
        }
    }

    /// Reference evaluation with ordinary precedence and left-to-right grouping
    fn reference_value(numbers: &[f64], ops: &[char]) -> f64 {
        let mut total = 0.0;
        let mut sign = 1.0;
        let mut term = numbers[0];
        for (op, &x) in ops.iter().zip(&numbers[1..]) {
            match op {
                '*' => term *= x,
                '/' => term /= x,
                _ => {
                    total += sign * term;
                    sign = if *op == '-' { -1.0 } else { 1.0 };
                    term = x;
                }
            }
        }
        total + sign * term
    }

    fn arb_expression() -> impl Strategy<Value = String> {
        let leaf = (1u32..100).prop_map(|x| x.to_string());
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                (
                    inner.clone(),
                    prop::sample::select(vec!["+", "-", "*", "/", ">", "="]),
                    inner.clone()
                )
                    .prop_map(|(a, op, b)| format!("{}{}{}", a, op, b)),
                inner.clone().prop_map(|a| format!("({})", a)),
                prop::collection::vec(inner.clone(), 1..4)
                    .prop_map(|xs| format!("SUM({})", xs.join(","))),
                (inner.clone(), inner.clone(), inner)
                    .prop_map(|(c, a, b)| format!("IF({},{},{})", c, a, b)),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_same_symbol_runs_fold(
            xs in prop::collection::vec(1u32..1000, 2..8),
            op in prop::sample::select(vec!['+', '-', '*', '/']),
        ) {
            let numbers: Vec<f64> = xs.iter().map(|&x| f64::from(x)).collect();
            let text = numbers
                .iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(&op.to_string());
            let value = eval(&format!("={}", text)).unwrap();

            let (first, rest) = (numbers[0], &numbers[1..]);
            let expected = match op {
                '+' => numbers.iter().sum::<f64>(),
                '*' => numbers.iter().product::<f64>(),
                '-' => first - rest.iter().sum::<f64>(),
                _ => first / rest.iter().product::<f64>(),
            };
            prop_assert_eq!(value, Value::Number(expected));
        }

        #[test]
        fn prop_mixed_precedence(
            first in 1u32..20,
            tail in prop::collection::vec(
                (prop::sample::select(vec!['+', '-', '*', '/']), 1u32..20),
                1..6,
            ),
        ) {
            let mut numbers = vec![f64::from(first)];
            let mut ops = Vec::new();
            let mut text = first.to_string();
            for (op, x) in &tail {
                ops.push(*op);
                numbers.push(f64::from(*x));
                text.push(*op);
                text.push_str(&x.to_string());
            }

            let expected = reference_value(&numbers, &ops);
            let value = eval(&format!("={}", text)).unwrap();
            let Value::Number(actual) = value else {
                return Err(TestCaseError::fail(format!("{} gave {:?}", text, value)));
            };
            let tolerance = 1e-6 * expected.abs().max(1.0);
            prop_assert!((actual - expected).abs() <= tolerance, "{} = {} not {}", text, actual, expected);
        }

        #[test]
        fn prop_stack_balanced(text in arb_expression()) {
            let wb = Workbook::new();
            let engine = Engine::new(&wb);
            let formula = Formula::parse(&text).unwrap();
            let mut frame = Frame::new("Sheet1");
            let mut session = Session::default();
            engine.eval(formula.entry(), &mut frame, &mut session).unwrap();
            prop_assert_eq!(frame.stack.height(), 0);
            let value = frame.take_register();
            prop_assert_ne!(value.error_kind(), Some(ErrorKind::InternalStackImbalance));
        }
    }
}
