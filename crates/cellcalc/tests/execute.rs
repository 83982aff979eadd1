//! Tests for running a workbook with inputs and outputs

mod common;

use cellcalc::prelude::*;
use common::{assert_number, fixture};
use pretty_assertions::assert_eq;

/// A small pricing sheet: age and plan in, premium out
fn pricer() -> Workbook {
    let mut wb = Workbook::with_sheets(["Pricer", "Rates"]).unwrap();

    let rates = wb.worksheet_by_name_mut("Rates").unwrap();
    for (row, (age, base)) in [(0.0, 80.0), (18.0, 100.0), (40.0, 150.0), (65.0, 240.0)]
        .into_iter()
        .enumerate()
    {
        rates.set_cell_value(&format!("A{}", row + 1), age).unwrap();
        rates.set_cell_value(&format!("B{}", row + 1), base).unwrap();
    }
    rates.set_cell_value("D1", "Plan 1").unwrap();
    rates.set_cell_value("E1", 1.0).unwrap();
    rates.set_cell_value("D2", "Plan 2").unwrap();
    rates.set_cell_value("E2", 1.25).unwrap();

    let pricer = wb.worksheet_by_name_mut("Pricer").unwrap();
    pricer
        .set_cell_formula("B10", "=VLOOKUP(B4, Rates!A1:B4, 2)")
        .unwrap();
    pricer
        .set_cell_formula("B11", "=VLOOKUP(B16, Rates!D1:E2, 2, FALSE)")
        .unwrap();
    pricer
        .set_cell_formula("B17", "=ROUND(B10 * B11 * IF(B4 >= 65, 1.1, 1), 2)")
        .unwrap();

    wb
}

#[test]
fn test_execute_pricer() {
    let mut wb = pricer();
    let options = ExecuteOptions {
        input_sheet: "Pricer".into(),
        ..ExecuteOptions::default()
    };

    let report = wb
        .execute_with_options(
            &[("B4", "18"), ("B16", "Plan 1")],
            &["Pricer!B17"],
            &options,
        )
        .unwrap();
    assert_eq!(report.inputs_written, 2);
    assert_number(report.get("Pricer!B17").unwrap(), 100.0);

    let report = wb
        .execute_with_options(&[("B4", "70"), ("B16", "Plan 2")], &["B17", "B11"], &options)
        .unwrap();
    assert_number(report.get("B17").unwrap(), 330.0);
    assert_number(report.get("B11").unwrap(), 1.25);
}

#[test]
fn test_execute_reports_lookup_misses() {
    let mut wb = pricer();
    let options = ExecuteOptions {
        input_sheet: "Pricer".into(),
        ..ExecuteOptions::default()
    };

    let report = wb
        .execute_with_options(&[("B4", "30"), ("B16", "Plan 9")], &["B17"], &options)
        .unwrap();
    assert_eq!(
        report.get("B17").and_then(Value::error_kind),
        Some(ErrorKind::NotAvailable)
    );
    assert_eq!(report.error_count(), 1);
}

#[test]
fn test_execute_writes_input_sheet_by_default() {
    let mut wb = fixture();
    let report = wb
        .execute(
            &[("B2", "1"), ("Discounts!E2", "Pricey")],
            &["B3", "Discounts!E2"],
        )
        .unwrap();
    assert_eq!(
        report.outputs,
        vec![
            ("B3".to_string(), Value::from("Pricey")),
            ("Discounts!E2".to_string(), Value::from("Pricey")),
        ]
    );

    // Inputs stay written after the run
    assert_number(
        &wb.evaluate_formula("=SUM(B2:D2)", "Input").unwrap(),
        25.0,
    );
}

#[test]
fn test_execute_formula_input() {
    let mut wb = fixture();
    let report = wb
        .execute(&[("E2", "=B2 * C2")], &["E2"])
        .unwrap();
    assert_number(report.get("E2").unwrap(), 110.0);
}

#[test]
fn test_execute_cycle_is_a_value() {
    let mut wb = fixture();
    let report = wb
        .execute(&[("F1", "=F2"), ("F2", "=F1 + 1")], &["F1", "B2"])
        .unwrap();
    assert_eq!(
        report.get("F1").and_then(Value::error_kind),
        Some(ErrorKind::CircularReference)
    );
    assert_number(report.get("B2").unwrap(), 10.0);
}

#[test]
fn test_execute_aborts_on_bad_addresses() {
    let mut wb = fixture();
    assert!(matches!(
        wb.execute(&[("", "1")], &["B2"]),
        Err(Error::InvalidAddress(_))
    ));
    assert!(matches!(
        wb.execute(&[], &["Missing!A1"]),
        Err(Error::InvalidAddress(_))
    ));
}
