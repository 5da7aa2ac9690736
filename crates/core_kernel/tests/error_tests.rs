//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::Kwh;

#[test]
fn test_out_of_range_names_field() {
    let error = CoreError::out_of_range("top", "must not be negative");

    match &error {
        CoreError::OutOfRange { field, reason } => {
            assert_eq!(field, "top");
            assert_eq!(reason, "must not be negative");
        }
        _ => panic!("Expected OutOfRange error"),
    }
    assert_eq!(error.to_string(), "top is out of range: must not be negative");
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::InvalidAmount("abc".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
    assert!(core_error.to_string().contains("abc"));
}

#[test]
fn test_parse_failure_converts_with_question_mark() {
    fn parse(raw: &str) -> Result<Kwh, CoreError> {
        Ok(Kwh::parse(raw)?)
    }

    assert!(parse("12.5").is_ok());
    assert!(matches!(parse("twelve"), Err(CoreError::Money(_))));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("Missing data_dir");

    match error {
        CoreError::Configuration(msg) => assert_eq!(msg, "Missing data_dir"),
        _ => panic!("Expected Configuration error"),
    }
}
