use std::fmt;

use serde_json::{Map, Number, Value};

use super::super::domain::RuleType;

/// Comparison requested by a threshold rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOperator {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equal,
    /// Operators outside the supported set never pass.
    Unsupported(String),
}

impl ComparisonOperator {
    pub fn parse(raw: &str) -> Self {
        match raw {
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterOrEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessOrEqual,
            "==" => Self::Equal,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            Self::GreaterThan => actual > expected,
            Self::GreaterOrEqual => actual >= expected,
            Self::LessThan => actual < expected,
            Self::LessOrEqual => actual <= expected,
            Self::Equal => actual == expected,
            Self::Unsupported(_) => false,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Typed form of a validation rule's stored parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
    Threshold {
        field: String,
        operator: ComparisonOperator,
        value: Number,
    },
    DateRange {
        field: String,
        start_date: String,
        end_date: String,
    },
    RequiredField {
        field: String,
    },
    FormatValidation,
}

/// Raised when stored rule parameters do not have the shape the rule type needs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleConfigError {
    #[error("missing parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("parameter '{name}' must be {expected}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
    },
}

impl ValidationRule {
    pub fn from_parameters(
        rule_type: RuleType,
        params: &Map<String, Value>,
    ) -> Result<Self, RuleConfigError> {
        match rule_type {
            RuleType::Threshold => {
                let field = string_param(params, "field")?;
                let operator = ComparisonOperator::parse(&string_param(params, "operator")?);
                let value = match params.get("value") {
                    None | Some(Value::Null) => {
                        return Err(RuleConfigError::MissingParameter("value"))
                    }
                    Some(Value::Number(number)) => number.clone(),
                    Some(_) => {
                        return Err(RuleConfigError::InvalidParameter {
                            name: "value",
                            expected: "a number",
                        })
                    }
                };
                Ok(Self::Threshold {
                    field,
                    operator,
                    value,
                })
            }
            RuleType::DateRange => Ok(Self::DateRange {
                field: string_param(params, "field")?,
                start_date: string_param(params, "start_date")?,
                end_date: string_param(params, "end_date")?,
            }),
            RuleType::RequiredField => Ok(Self::RequiredField {
                field: string_param(params, "field")?,
            }),
            RuleType::FormatValidation => Ok(Self::FormatValidation),
        }
    }
}

fn string_param(params: &Map<String, Value>, name: &'static str) -> Result<String, RuleConfigError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(RuleConfigError::MissingParameter(name)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(RuleConfigError::InvalidParameter {
            name,
            expected: "a string",
        }),
    }
}
