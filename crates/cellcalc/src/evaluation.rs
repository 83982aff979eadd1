//! Workbook-level formula evaluation
//!
//! Evaluates formulas and cells of a [`Workbook`], and runs a workbook as a
//! function: write some inputs, read some outputs.
//!
//! # Example
//!
//! ```rust
//! use cellcalc::prelude::*;
//!
//! let mut workbook = Workbook::with_sheets(["Input"]).unwrap();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_formula("C1", "=A1*B1").unwrap();
//!
//! let report = workbook
//!     .execute(&[("A1", "6"), ("B1", "7")], &["C1"])
//!     .unwrap();
//! assert_eq!(report.get("C1"), Some(&Value::Number(42.0)));
//! ```

use cellcalc_formula::{Engine, EngineOptions, FormulaError, Resolver};
use tracing::debug;

use crate::{Error, Result, Value, Workbook};

/// Options for [`WorkbookEvaluationExt::execute_with_options`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOptions {
    /// Sheet for unqualified input and output addresses (default: "Input")
    pub input_sheet: String,
    /// Settings for the evaluation engine
    pub engine: EngineOptions,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            input_sheet: "Input".to_string(),
            engine: EngineOptions::default(),
        }
    }
}

/// Outcome of an [`execute`](WorkbookEvaluationExt::execute) run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Number of input cells written
    pub inputs_written: usize,
    /// Output addresses, as requested, with their values
    pub outputs: Vec<(String, Value)>,
}

impl ExecutionReport {
    /// Value of the first output requested under `address`
    pub fn get(&self, address: &str) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, v)| v)
    }

    /// Number of outputs that evaluated to an error value
    pub fn error_count(&self) -> usize {
        self.outputs.iter().filter(|(_, v)| v.is_error()).count()
    }
}

/// Extension trait for Workbook to add evaluation methods
pub trait WorkbookEvaluationExt {
    /// Parse and evaluate a free-standing formula against `sheet`
    fn evaluate_formula(&self, text: &str, sheet: &str) -> Result<Value>;

    /// Value of one cell; formula cells are evaluated, literal cells are coerced
    fn evaluate_cell(&self, address: &str) -> Result<Value>;

    /// Write `inputs`, then evaluate `outputs` in order, with default options
    fn execute(&mut self, inputs: &[(&str, &str)], outputs: &[&str]) -> Result<ExecutionReport>;

    /// Write `inputs`, then evaluate `outputs` in order
    fn execute_with_options(
        &mut self,
        inputs: &[(&str, &str)],
        outputs: &[&str],
        options: &ExecuteOptions,
    ) -> Result<ExecutionReport>;
}

impl WorkbookEvaluationExt for Workbook {
    fn evaluate_formula(&self, text: &str, sheet: &str) -> Result<Value> {
        Engine::new(self)
            .evaluate_text(text, sheet)
            .map_err(into_core_error)
    }

    fn evaluate_cell(&self, address: &str) -> Result<Value> {
        let engine = Engine::new(self);
        let sheet = engine.context_sheet();
        engine
            .evaluate_cell(address, &sheet)
            .map_err(into_core_error)
    }

    fn execute(&mut self, inputs: &[(&str, &str)], outputs: &[&str]) -> Result<ExecutionReport> {
        self.execute_with_options(inputs, outputs, &ExecuteOptions::default())
    }

    fn execute_with_options(
        &mut self,
        inputs: &[(&str, &str)],
        outputs: &[&str],
        options: &ExecuteOptions,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();

        for (address, raw) in inputs {
            debug!(address, raw, sheet = %options.input_sheet, "writing input");
            self.set_cell(address, &options.input_sheet, raw)
                .map_err(|e| Error::InvalidAddress(format!("input {}: {}", address, e)))?;
            report.inputs_written += 1;
        }

        // Output cells are referenced formulas, so an unknown function in one
        // comes back as its NameNotFound value
        let engine = Engine::new(&*self).with_options(options.engine.clone());
        for address in outputs {
            let value = match engine.evaluate_cell(address, &options.input_sheet) {
                Ok(value) => value,
                Err(FormulaError::Resolve(e)) => {
                    return Err(Error::InvalidAddress(format!("output {}: {}", address, e)))
                }
                Err(e) => return Err(into_core_error(e)),
            };
            debug!(address, value = %value, "output evaluated");
            report.outputs.push((address.to_string(), value));
        }

        Ok(report)
    }
}

/// Map a formula failure onto the workbook error type
fn into_core_error(err: FormulaError) -> Error {
    match err {
        FormulaError::Tokenize { .. } | FormulaError::Parse(_) => {
            Error::FormulaParse(err.to_string())
        }
        FormulaError::Resolve(e) => Error::InvalidAddress(e.to_string()),
        other => Error::Evaluation(other.to_string()),
    }
}
