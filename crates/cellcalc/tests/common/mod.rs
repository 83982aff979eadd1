//! Shared fixture workbook for integration tests

#![allow(dead_code)]

use cellcalc::prelude::*;

pub const EPSILON: f64 = 1e-9;

/// `Input` sheet with a few numbers and a cross-sheet formula, and a
/// `Discounts` lookup table
///
/// ```text
/// Input:      B2=10  C2=11  D2=13  B3==Discounts!E2
/// Discounts:  A2:A6 = 1..5   B2:B6 = 0.5 1.5 2.5 5.4 7.0   E2="Cheap"
/// ```
pub fn fixture() -> Workbook {
    let mut wb = Workbook::with_sheets(["Input", "Discounts"]).unwrap();

    let input = wb.worksheet_by_name_mut("Input").unwrap();
    input.set_cell_value("B2", 10.0).unwrap();
    input.set_cell_value("C2", 11.0).unwrap();
    input.set_cell_value("D2", 13.0).unwrap();
    input.set_cell_formula("B3", "=Discounts!E2").unwrap();

    let discounts = wb.worksheet_by_name_mut("Discounts").unwrap();
    for (row, discount) in [0.5, 1.5, 2.5, 5.4, 7.0].into_iter().enumerate() {
        let row = row + 2;
        discounts
            .set_cell_value(&format!("A{}", row), (row - 1) as f64)
            .unwrap();
        discounts
            .set_cell_value(&format!("B{}", row), discount)
            .unwrap();
    }
    discounts.set_cell_value("E2", "Cheap").unwrap();

    wb
}

/// Evaluate `text` against the `Input` sheet of the fixture
pub fn eval(text: &str) -> Value {
    fixture().evaluate_formula(text, "Input").unwrap()
}

pub fn assert_number(value: &Value, expected: f64) {
    match value {
        Value::Number(n) => assert!(
            (n - expected).abs() < EPSILON,
            "Expected {}, got {}",
            expected,
            n
        ),
        other => panic!("Expected Number({}), got {:?}", expected, other),
    }
}
