use serde_json::{Map, Value};

use super::super::domain::{Attribute, Finding, FindingStatus, RuleType, WorkPaper};
use super::params::{ComparisonOperator, RuleConfigError, ValidationRule};

pub(crate) fn evaluate_validation_rule(
    work_paper: &WorkPaper,
    attribute: &Attribute,
    rule_type: Option<RuleType>,
    rule_parameters: Option<&Map<String, Value>>,
) -> Finding {
    let finding = Finding::pass(attribute);

    let (rule_type, params) = match (rule_type, rule_parameters) {
        (Some(rule_type), Some(params)) if !params.is_empty() => (rule_type, params),
        _ => {
            return finding
                .with_status(FindingStatus::Warning)
                .with_details("Validation rule not properly configured")
        }
    };

    let empty = Map::new();
    let form_data = work_paper.form_data.as_ref().unwrap_or(&empty);

    let outcome = ValidationRule::from_parameters(rule_type, params)
        .and_then(|rule| apply_rule(&rule, form_data, finding.clone()));

    match outcome {
        Ok(finding) => finding,
        Err(err) => finding
            .with_status(FindingStatus::Warning)
            .with_details(format!("Error evaluating rule: {err}")),
    }
}

fn apply_rule(
    rule: &ValidationRule,
    form_data: &Map<String, Value>,
    finding: Finding,
) -> Result<Finding, RuleConfigError> {
    match rule {
        ValidationRule::Threshold {
            field,
            operator,
            value,
        } => Ok(check_threshold(form_data, field, operator, value, finding)),
        ValidationRule::RequiredField { field } => Ok(check_required(form_data, field, finding)),
        ValidationRule::DateRange {
            field,
            start_date,
            end_date,
        } => check_date_range(form_data, field, start_date, end_date, finding),
        ValidationRule::FormatValidation => Ok(finding
            .with_status(FindingStatus::Warning)
            .with_details("Format validation is not implemented for this attribute")
            .with_recommendation("Configure a supported rule type or review this attribute manually")),
    }
}

fn check_threshold(
    form_data: &Map<String, Value>,
    field: &str,
    operator: &ComparisonOperator,
    expected: &serde_json::Number,
    finding: Finding,
) -> Finding {
    let Some(raw) = form_data.get(field) else {
        return finding
            .with_status(FindingStatus::Fail)
            .with_details(format!("Required field '{field}' not found in work paper"))
            .with_recommendation(format!("Ensure field '{field}' is included in the work paper"));
    };

    let Some(actual) = coerce_number(raw) else {
        return finding
            .with_status(FindingStatus::Fail)
            .with_details(format!(
                "Field '{field}' value '{}' is not numeric",
                display_value(raw)
            ))
            .with_recommendation(format!("Ensure field '{field}' contains a valid number"));
    };

    // Number::as_f64 only fails for arbitrary-precision builds, which compare as unmet.
    let passed = expected
        .as_f64()
        .map(|expected| operator.compare(actual, expected))
        .unwrap_or(false);

    if passed {
        finding
    } else {
        finding
            .with_status(FindingStatus::Fail)
            .with_details(format!(
                "Field '{field}' value {actual} does not meet requirement: {operator} {expected}"
            ))
            .with_recommendation(format!("Review and correct the value for '{field}'"))
    }
}

fn check_required(form_data: &Map<String, Value>, field: &str, finding: Finding) -> Finding {
    let missing = match form_data.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    };

    if missing {
        finding
            .with_status(FindingStatus::Fail)
            .with_details(format!("Required field '{field}' is missing or empty"))
            .with_recommendation(format!("Ensure field '{field}' is provided with a value"))
    } else {
        finding
    }
}

/// Bounds are compared as plain strings, which only orders zero-padded `YYYY-MM-DD` values correctly.
fn check_date_range(
    form_data: &Map<String, Value>,
    field: &str,
    start_date: &str,
    end_date: &str,
    finding: Finding,
) -> Result<Finding, RuleConfigError> {
    let Some(raw) = form_data.get(field) else {
        return Ok(finding
            .with_status(FindingStatus::Fail)
            .with_details(format!("Date field '{field}' not found"))
            .with_recommendation(format!("Ensure date field '{field}' is included")));
    };

    let Value::String(value) = raw else {
        return Err(RuleConfigError::InvalidParameter {
            name: "field",
            expected: "a date string in the work paper",
        });
    };

    if value.as_str() < start_date || value.as_str() > end_date {
        Ok(finding
            .with_status(FindingStatus::Fail)
            .with_details(format!(
                "Date '{value}' is outside required range ({start_date} to {end_date})"
            ))
            .with_recommendation("Ensure date is within the specified range"))
    } else {
        Ok(finding)
    }
}

/// Numbers pass through, booleans count as 1/0 and strings are parsed after trimming.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
