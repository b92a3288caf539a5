use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured form fields captured on a work paper.
pub type FormData = Map<String, Value>;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier for a configured audit attribute.
    AttributeId
);
numeric_id!(
    /// Identifier for a submitted work paper.
    WorkPaperId
);
numeric_id!(
    /// Identifier for a generated conclusion.
    ConclusionId
);
numeric_id!(
    /// Identifier for the user an action is attributed to.
    UserId
);

/// Rule families a validation attribute can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Threshold,
    DateRange,
    RequiredField,
    FormatValidation,
}

/// Parameter group of an attribute, selected by `attribute_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "attribute_type", rename_all = "snake_case")]
pub enum AttributeKind {
    ValidationRule {
        #[serde(default)]
        rule_type: Option<RuleType>,
        #[serde(default)]
        rule_parameters: Option<Map<String, Value>>,
    },
    ChecklistCriteria {
        #[serde(default)]
        criteria_text: String,
        #[serde(default = "default_required")]
        is_required: bool,
    },
}

fn default_required() -> bool {
    true
}

impl AttributeKind {
    pub const fn label(&self) -> &'static str {
        match self {
            AttributeKind::ValidationRule { .. } => "validation_rule",
            AttributeKind::ChecklistCriteria { .. } => "checklist_criteria",
        }
    }
}

/// Audit attribute as stored and exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: AttributeKind,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted when defining a new attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// Partial update applied to an existing attribute. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attribute_type: Option<AttributeTypeName>,
    #[serde(default)]
    pub rule_type: Option<RuleType>,
    #[serde(default)]
    pub rule_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub criteria_text: Option<String>,
    #[serde(default)]
    pub is_required: Option<bool>,
}

/// Bare attribute type tag, used when an update switches parameter groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeTypeName {
    ValidationRule,
    ChecklistCriteria,
}

impl Attribute {
    /// Apply a partial update. Switching `attribute_type` starts the new
    /// parameter group from the fields supplied in the same update.
    pub fn apply(&mut self, update: AttributeUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if update.description.is_some() {
            self.description = update.description;
        }

        let switch_to = match (update.attribute_type, &self.kind) {
            (Some(AttributeTypeName::ValidationRule), AttributeKind::ChecklistCriteria { .. }) => {
                Some(AttributeKind::ValidationRule {
                    rule_type: None,
                    rule_parameters: None,
                })
            }
            (Some(AttributeTypeName::ChecklistCriteria), AttributeKind::ValidationRule { .. }) => {
                Some(AttributeKind::ChecklistCriteria {
                    criteria_text: String::new(),
                    is_required: true,
                })
            }
            _ => None,
        };
        if let Some(kind) = switch_to {
            self.kind = kind;
        }

        match &mut self.kind {
            AttributeKind::ValidationRule {
                rule_type,
                rule_parameters,
            } => {
                if update.rule_type.is_some() {
                    *rule_type = update.rule_type;
                }
                if update.rule_parameters.is_some() {
                    *rule_parameters = update.rule_parameters;
                }
            }
            AttributeKind::ChecklistCriteria {
                criteria_text,
                is_required,
            } => {
                if let Some(text) = update.criteria_text {
                    *criteria_text = text;
                }
                if let Some(required) = update.is_required {
                    *is_required = required;
                }
            }
        }
    }
}

/// Lifecycle of a submitted work paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPaperStatus {
    Pending,
    Audited,
}

impl WorkPaperStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkPaperStatus::Pending => "pending",
            WorkPaperStatus::Audited => "audited",
        }
    }
}

/// Submitted audit form plus references to its stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPaper {
    pub id: WorkPaperId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub form_data: Option<FormData>,
    #[serde(default)]
    pub file_paths: Vec<String>,
    pub status: WorkPaperStatus,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
}

/// Inbound work paper fields before identifiers and documents are assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkPaperSubmission {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub form_data: Option<FormData>,
}

/// Outcome bucket for a single attribute evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pass,
    Fail,
    Warning,
}

impl FindingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FindingStatus::Pass => "pass",
            FindingStatus::Fail => "fail",
            FindingStatus::Warning => "warning",
        }
    }
}

/// Per-attribute evaluation outcome for one work paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub attribute_id: AttributeId,
    pub attribute_name: String,
    pub status: FindingStatus,
    pub details: Option<String>,
    pub recommendation: Option<String>,
}

impl Finding {
    pub(crate) fn pass(attribute: &Attribute) -> Self {
        Self {
            attribute_id: attribute.id,
            attribute_name: attribute.name.clone(),
            status: FindingStatus::Pass,
            details: None,
            recommendation: None,
        }
    }

    pub(crate) fn with_status(mut self, status: FindingStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub(crate) fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Aggregate counts reported alongside a conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub total_attributes: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub compliance_percentage: f64,
}

/// Persisted audit conclusion, at most one per work paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
    pub id: ConclusionId,
    pub work_paper_id: WorkPaperId,
    pub generated_at: DateTime<Utc>,
    pub overall_score: f64,
    pub compliance_summary: ComplianceSummary,
    pub findings: Vec<Finding>,
    pub cpa_conclusion_text: String,
}
