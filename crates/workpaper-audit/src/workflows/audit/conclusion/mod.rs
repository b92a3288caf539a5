mod narrative;

pub use narrative::ComplianceTier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ComplianceSummary, Conclusion, ConclusionId, Finding, WorkPaperId};
use super::evaluation::AuditResults;
use super::repository::{AttributeRepository, RepositoryError};
use narrative::NarrativeInput;

/// Placeholder name for findings whose attribute was deleted before the conclusion was drafted.
pub const UNKNOWN_ATTRIBUTE_NAME: &str = "Unknown";

/// Conclusion content ready to persist; identity and timestamp are assigned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConclusionDraft {
    pub work_paper_id: WorkPaperId,
    pub overall_score: f64,
    pub compliance_summary: ComplianceSummary,
    pub findings: Vec<Finding>,
    pub cpa_conclusion_text: String,
}

impl ConclusionDraft {
    pub fn into_conclusion(self, id: ConclusionId, generated_at: DateTime<Utc>) -> Conclusion {
        Conclusion {
            id,
            work_paper_id: self.work_paper_id,
            generated_at,
            overall_score: self.overall_score,
            compliance_summary: self.compliance_summary,
            findings: self.findings,
            cpa_conclusion_text: self.cpa_conclusion_text,
        }
    }
}

/// Percentage of passed attributes; warnings sit in the denominator only.
pub fn compliance_percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

/// Two decimal places, ties to even, so the score agrees with the `{:.2}` narrative figure.
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round_ties_even() / 100.0
}

/// Turns audit results into a scored, narrated conclusion draft.
pub struct ConclusionGenerator<'a, A: ?Sized> {
    attributes: &'a A,
}

impl<'a, A> ConclusionGenerator<'a, A>
where
    A: AttributeRepository + ?Sized,
{
    pub fn new(attributes: &'a A) -> Self {
        Self { attributes }
    }

    pub fn generate(&self, results: &AuditResults) -> Result<ConclusionDraft, RepositoryError> {
        let total = results.attributes_checked;
        let score = compliance_percentage(results.passed, total);

        let findings = results
            .findings
            .iter()
            .map(|finding| self.with_current_name(finding))
            .collect::<Result<Vec<_>, _>>()?;

        // The summary keeps the unrounded percentage; only overall_score is rounded.
        let compliance_summary = ComplianceSummary {
            total_attributes: total,
            passed: results.passed,
            failed: results.failed,
            warnings: results.warnings,
            compliance_percentage: score,
        };

        let cpa_conclusion_text = narrative::render(&NarrativeInput {
            score,
            total,
            passed: results.passed,
            failed: results.failed,
            warnings: results.warnings,
            findings: &findings,
        });

        Ok(ConclusionDraft {
            work_paper_id: results.work_paper_id,
            overall_score: round_score(score),
            compliance_summary,
            findings,
            cpa_conclusion_text,
        })
    }

    fn with_current_name(&self, finding: &Finding) -> Result<Finding, RepositoryError> {
        let attribute_name = self
            .attributes
            .fetch(finding.attribute_id)?
            .map(|attribute| attribute.name)
            .unwrap_or_else(|| UNKNOWN_ATTRIBUTE_NAME.to_string());

        Ok(Finding {
            attribute_name,
            ..finding.clone()
        })
    }
}
