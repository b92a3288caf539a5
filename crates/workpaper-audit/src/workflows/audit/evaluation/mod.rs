mod checklist;
mod params;
mod rules;

pub use params::{ComparisonOperator, RuleConfigError, ValidationRule};

use serde::{Deserialize, Serialize};

use super::domain::{Attribute, AttributeKind, Finding, FindingStatus, WorkPaper, WorkPaperId};
use super::repository::{AttributeRepository, RepositoryError, WorkPaperRepository};

/// Stateless evaluator mapping one attribute over one work paper to a finding.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, work_paper: &WorkPaper, attribute: &Attribute) -> Finding {
        match &attribute.kind {
            AttributeKind::ValidationRule {
                rule_type,
                rule_parameters,
            } => rules::evaluate_validation_rule(
                work_paper,
                attribute,
                *rule_type,
                rule_parameters.as_ref(),
            ),
            AttributeKind::ChecklistCriteria {
                criteria_text,
                is_required,
            } => checklist::evaluate_checklist(work_paper, attribute, criteria_text, *is_required),
        }
    }
}

/// Aggregate of one audit run. Status buckets always sum to `attributes_checked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResults {
    pub work_paper_id: WorkPaperId,
    pub attributes_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub findings: Vec<Finding>,
}

impl AuditResults {
    pub fn empty(work_paper_id: WorkPaperId) -> Self {
        Self {
            work_paper_id,
            attributes_checked: 0,
            passed: 0,
            failed: 0,
            warnings: 0,
            findings: Vec::new(),
        }
    }

    pub fn record(&mut self, finding: Finding) {
        match finding.status {
            FindingStatus::Pass => self.passed += 1,
            FindingStatus::Fail => self.failed += 1,
            FindingStatus::Warning => self.warnings += 1,
        }
        self.attributes_checked += 1;
        self.findings.push(finding);
    }
}

/// Evaluate every attribute against the work paper, in the order given.
pub fn evaluate_all(
    evaluator: &RuleEvaluator,
    work_paper: &WorkPaper,
    attributes: &[Attribute],
) -> AuditResults {
    attributes.iter().fold(
        AuditResults::empty(work_paper.id),
        |mut results, attribute| {
            results.record(evaluator.evaluate(work_paper, attribute));
            results
        },
    )
}

/// Errors surfaced while loading the inputs of an audit run.
#[derive(Debug, thiserror::Error)]
pub enum AuditRunError {
    #[error("work paper {0} not found")]
    WorkPaperNotFound(WorkPaperId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Loads a work paper and every configured attribute, then scores them. Read-only.
pub struct AuditRunner<'a, W: ?Sized, A: ?Sized> {
    work_papers: &'a W,
    attributes: &'a A,
    evaluator: RuleEvaluator,
}

impl<'a, W, A> AuditRunner<'a, W, A>
where
    W: WorkPaperRepository + ?Sized,
    A: AttributeRepository + ?Sized,
{
    pub fn new(work_papers: &'a W, attributes: &'a A) -> Self {
        Self {
            work_papers,
            attributes,
            evaluator: RuleEvaluator::new(),
        }
    }

    pub fn run(&self, work_paper_id: WorkPaperId) -> Result<AuditResults, AuditRunError> {
        let work_paper = self
            .work_papers
            .fetch(work_paper_id)?
            .ok_or(AuditRunError::WorkPaperNotFound(work_paper_id))?;

        // Every attribute applies to every work paper.
        let attributes = self.attributes.list_all()?;
        Ok(evaluate_all(&self.evaluator, &work_paper, &attributes))
    }
}
