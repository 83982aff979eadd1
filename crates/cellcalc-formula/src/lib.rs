//! # cellcalc-formula
//!
//! Formula compiler and stack-based evaluator for cellcalc.
//!
//! This crate provides:
//! - Tokenizing formula text into typed tokens
//! - Building a syntax tree with infix precedence (text → [`Formula`])
//! - Evaluating a tree over an operand stack ([`Engine`])
//! - Built-in functions behind the [`FunctionLibrary`] seam
//! - Reading and writing cells behind the [`Resolver`] seam
//!
//! ## Example
//!
//! ```rust
//! use cellcalc_core::Workbook;
//! use cellcalc_formula::{parse_formula, Engine, Resolver, Value};
//!
//! let mut workbook = Workbook::new();
//! workbook.set_cell("A1", "Sheet1", "10").unwrap();
//! workbook.set_cell("A2", "Sheet1", "=A1*3").unwrap();
//!
//! let formula = parse_formula("=SUM(A1:A2) + 1").unwrap();
//! let value = Engine::new(&workbook).evaluate(&formula).unwrap();
//! assert_eq!(value, Value::Number(41.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod resolver;
pub mod tokenizer;
pub mod value;

pub use ast::{Formula, Node, NodeKind, IDENTITY};
pub use error::{FormulaError, FormulaResult, FunctionError, ResolveError};
pub use evaluator::{Engine, EngineOptions};
pub use functions::{builtin, FunctionDef, FunctionLibrary, FunctionRegistry};
pub use parser::{parse_formula, parse_tokens};
pub use resolver::{RawCell, RawRange, Resolver};
pub use tokenizer::{tokenize, Token};
pub use value::{ErrorKind, Value};
