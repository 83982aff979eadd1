//! Built-in spreadsheet functions
//!
//! The evaluator only sees the [`FunctionLibrary`] trait. The built-in
//! implementation is a [`FunctionRegistry`] that maps upper-cased names to
//! [`FunctionDef`]s and checks argument counts before dispatching.

pub mod criteria;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;

use ahash::AHashMap;
use once_cell::sync::Lazy;

use crate::error::FunctionError;
use crate::value::Value;

/// Result of a function implementation
pub type FunctionResult = Result<Value, FunctionError>;

/// Function implementation signature
///
/// Value-level problems (a lookup miss, an error operand) are returned as
/// `Ok(Value::Error(..))`. `Err` means the call itself was invalid.
pub type FunctionImpl = fn(&[Value]) -> FunctionResult;

/// Dispatch contract between the evaluator and a set of functions
pub trait FunctionLibrary {
    /// Whether `name` is a known function (case-insensitive)
    fn exists(&self, name: &str) -> bool;

    /// Call `name` with operands in left-to-right order
    fn call(&self, name: &str, operands: &[Value]) -> FunctionResult;
}

/// One registered function with its accepted argument counts
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions
    pub max_args: Option<usize>,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
        }
    }

    fn check_arity(&self, actual: usize) -> Result<(), FunctionError> {
        let too_few = actual < self.min_args;
        let too_many = self.max_args.is_some_and(|max| actual > max);
        if !too_few && !too_many {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(FunctionError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual,
        })
    }
}

/// Name-keyed set of [`FunctionDef`]s
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

static BUILTIN: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// The shared registry of built-in functions
pub fn builtin() -> &'static FunctionRegistry {
    &BUILTIN
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_lookup_functions();
        registry.register_statistical_functions();

        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    /// Register a function, replacing any previous definition with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_ascii_uppercase(), def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_all(&mut self, defs: impl IntoIterator<Item = FunctionDef>) {
        for def in defs {
            self.register(def);
        }
    }

    fn register_math_functions(&mut self) {
        self.register_all([
            FunctionDef::new("SUM", 1, None, math::fn_sum),
            FunctionDef::new("AVERAGE", 1, None, math::fn_average),
            FunctionDef::new("MIN", 1, None, math::fn_min),
            FunctionDef::new("MAX", 1, None, math::fn_max),
            FunctionDef::new("COUNT", 1, None, math::fn_count),
            FunctionDef::new("ABS", 1, Some(1), math::fn_abs),
            FunctionDef::new("ROUND", 1, Some(2), math::fn_round),
            FunctionDef::new("FLOOR", 1, Some(2), math::fn_floor),
            FunctionDef::new("POWER", 2, Some(2), math::fn_power),
        ]);
    }

    fn register_logical_functions(&mut self) {
        // IF, TRUE and FALSE are control flow in the evaluator
        self.register_all([
            FunctionDef::new("AND", 1, None, logical::fn_and),
            FunctionDef::new("OR", 1, None, logical::fn_or),
            FunctionDef::new("NOT", 1, Some(1), logical::fn_not),
            FunctionDef::new("IFERROR", 2, Some(2), logical::fn_iferror),
        ]);
    }

    fn register_lookup_functions(&mut self) {
        self.register_all([
            FunctionDef::new("VLOOKUP", 3, Some(4), lookup::fn_vlookup),
            FunctionDef::new("MATCH", 2, Some(3), lookup::fn_match),
            FunctionDef::new("INDEX", 2, Some(3), lookup::fn_index),
        ]);
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef::new(
            "COUNTIF",
            2,
            Some(2),
            statistical::fn_countif,
        ));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionLibrary for FunctionRegistry {
    fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn call(&self, name: &str, operands: &[Value]) -> FunctionResult {
        let def = self
            .get(name)
            .ok_or_else(|| FunctionError::UnknownFunction(name.to_string()))?;
        def.check_arity(operands.len())?;
        (def.implementation)(operands)
    }
}

/// First error value among the arguments, looking inside lists and matrices
pub(crate) fn first_error(args: &[Value]) -> Option<Value> {
    args.iter()
        .flat_map(Value::scalars)
        .find(|v| v.is_error())
        .cloned()
}

/// Scalar argument as a number
///
/// Numbers and booleans convert directly; text must look numeric.
pub(crate) fn number_arg(function: &str, value: &Value) -> Result<f64, FunctionError> {
    match value {
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            FunctionError::Argument(format!("{} expects a number, got text '{}'", function, s))
        }),
        other => other.as_number().ok_or_else(|| {
            FunctionError::Argument(format!(
                "{} expects a number, got {}",
                function,
                other.type_name()
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_catalogue() {
        let registry = builtin();
        for name in [
            "SUM", "FLOOR", "POWER", "ROUND", "ABS", "MIN", "MAX", "AVERAGE", "COUNT", "AND", "OR",
            "NOT", "IFERROR", "VLOOKUP", "MATCH", "INDEX", "COUNTIF",
        ] {
            assert!(registry.exists(name), "{} should be registered", name);
        }
        assert!(registry.exists("sum"));
        assert!(!registry.exists("NOPE"));
        assert_eq!(registry.len(), 17);
    }

    #[test]
    fn test_call_checks_arity() {
        let registry = builtin();
        assert_eq!(
            registry.call("POWER", &[2.0.into(), 3.0.into()]),
            Ok(Value::Number(8.0))
        );

        let err = registry.call("POWER", &[2.0.into()]).unwrap_err();
        assert_eq!(
            err,
            FunctionError::ArgumentCount {
                function: "POWER".into(),
                expected: "2".into(),
                actual: 1,
            }
        );
        assert_eq!(
            err.to_string(),
            "Wrong number of arguments for POWER: expected 2, got 1"
        );

        assert!(matches!(
            registry.call("ROUND", &[]),
            Err(FunctionError::ArgumentCount { .. })
        ));
        assert!(matches!(
            registry.call("NOPE", &[]),
            Err(FunctionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_custom_registry() {
        fn fn_answer(_args: &[Value]) -> FunctionResult {
            Ok(Value::Number(42.0))
        }

        let mut registry = FunctionRegistry::empty();
        assert!(registry.is_empty());
        registry.register(FunctionDef::new("Answer", 0, Some(0), fn_answer));
        assert_eq!(registry.names(), vec!["Answer"]);
        assert_eq!(registry.call("ANSWER", &[]), Ok(Value::Number(42.0)));
    }

    #[test]
    fn test_helpers() {
        let args = vec![
            Value::Number(1.0),
            Value::List(vec![Value::Number(2.0), Value::not_available()]),
        ];
        assert_eq!(first_error(&args), Some(Value::not_available()));
        assert_eq!(first_error(&args[..1]), None);

        assert_eq!(number_arg("F", &Value::from(" 2.5")), Ok(2.5));
        assert_eq!(number_arg("F", &Value::Boolean(true)), Ok(1.0));
        assert!(number_arg("F", &Value::from("abc")).is_err());
        assert!(number_arg("F", &Value::List(vec![])).is_err());
    }
}
