use crate::infra::{InMemoryAuditRepository, ManifestDocumentStorage};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use workpaper_audit::error::AppError;
use workpaper_audit::workflows::audit::{
    AttributeDefinition, AuditOutcome, AuditService, Conclusion, FormData,
    ServiceIdentity, UploadedDocument, UserId, WorkPaperSubmission,
};

#[derive(Args, Debug, Default)]
pub(crate) struct AuditArgs {
    /// JSON fixture with `attributes` and a `work_paper`. Defaults to a built-in sample.
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Write per-attribute findings to this CSV file
    #[arg(long)]
    pub(crate) findings_csv: Option<PathBuf>,
}

/// Attributes plus one work paper, audited together in a throwaway store.
#[derive(Debug, Deserialize)]
pub(crate) struct AuditFixture {
    pub(crate) attributes: Vec<AttributeDefinition>,
    pub(crate) work_paper: FixtureWorkPaper,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureWorkPaper {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) form_data: Option<FormData>,
    /// Names of supporting documents; only their presence is audited.
    #[serde(default)]
    pub(crate) files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FindingRow<'a> {
    attribute_id: u64,
    attribute_name: &'a str,
    status: &'static str,
    details: &'a str,
    recommendation: &'a str,
}

pub(crate) fn run_audit(args: AuditArgs) -> Result<(), AppError> {
    let AuditArgs {
        input,
        findings_csv,
    } = args;

    let fixture = match input {
        Some(path) => load_fixture(&path)?,
        None => sample_fixture()?,
    };

    let outcome = audit_fixture(fixture)?;
    render_outcome(&outcome);

    if let Some(path) = findings_csv {
        let file = fs::File::create(&path)?;
        write_findings(file, &outcome.conclusion)?;
        println!("\nFindings written to {}", path.display());
    }

    Ok(())
}

pub(crate) fn load_fixture(path: &Path) -> Result<AuditFixture, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn audit_fixture(fixture: AuditFixture) -> Result<AuditOutcome, AppError> {
    let repository = Arc::new(InMemoryAuditRepository::default());
    let service = AuditService::new(
        repository.clone(),
        repository.clone(),
        repository,
        Arc::new(ManifestDocumentStorage::default()),
        ServiceIdentity::manager(UserId(1), "default@example.com"),
    );

    for definition in fixture.attributes {
        service.create_attribute(definition)?;
    }

    let FixtureWorkPaper {
        title,
        description,
        form_data,
        files,
    } = fixture.work_paper;
    let documents = files
        .into_iter()
        .map(|name| UploadedDocument::new(name, Vec::new()))
        .collect();
    let work_paper = service.submit_work_paper(
        WorkPaperSubmission {
            title,
            description,
            form_data,
        },
        documents,
    )?;

    Ok(service.trigger_audit(work_paper.id)?)
}

fn render_outcome(outcome: &AuditOutcome) {
    let conclusion = &outcome.conclusion;
    let summary = &conclusion.compliance_summary;

    println!("Work paper #{}: {}", outcome.work_paper.id, outcome.work_paper.title);
    println!(
        "- {} attributes | {} passed | {} failed | {} warnings | score {:.2}%",
        summary.total_attributes,
        summary.passed,
        summary.failed,
        summary.warnings,
        conclusion.overall_score
    );
    for finding in &conclusion.findings {
        println!(
            "  - [{}] {}",
            finding.status.label().to_uppercase(),
            finding.attribute_name
        );
    }
    println!("\n{}", conclusion.cpa_conclusion_text);
}

/// Write one CSV row per finding, in evaluation order.
pub(crate) fn write_findings<W: io::Write>(
    writer: W,
    conclusion: &Conclusion,
) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    for finding in &conclusion.findings {
        csv.serialize(FindingRow {
            attribute_id: finding.attribute_id.0,
            attribute_name: &finding.attribute_name,
            status: finding.status.label(),
            details: finding.details.as_deref().unwrap_or_default(),
            recommendation: finding.recommendation.as_deref().unwrap_or_default(),
        })
        .map_err(|err| AppError::Export(err.to_string()))?;
    }
    csv.flush()?;
    Ok(())
}

pub(crate) fn sample_fixture() -> Result<AuditFixture, AppError> {
    let fixture = json!({
        "attributes": [
            {
                "name": "Closing cash balance",
                "description": "Reconciled balance must meet the materiality floor",
                "attribute_type": "validation_rule",
                "rule_type": "threshold",
                "rule_parameters": { "field": "cash_balance", "operator": ">=", "value": 1000 }
            },
            {
                "name": "Preparer sign-off",
                "attribute_type": "validation_rule",
                "rule_type": "required_field",
                "rule_parameters": { "field": "preparer" }
            },
            {
                "name": "Reporting period",
                "attribute_type": "validation_rule",
                "rule_type": "date_range",
                "rule_parameters": {
                    "field": "period_end",
                    "start_date": "2024-01-01",
                    "end_date": "2024-12-31"
                }
            },
            {
                "name": "Bank confirmation",
                "attribute_type": "checklist_criteria",
                "criteria_text": "Bank confirmation letter attached",
                "is_required": true
            },
            {
                "name": "Management representation",
                "attribute_type": "checklist_criteria",
                "criteria_text": "Management representation letter",
                "is_required": false
            }
        ],
        "work_paper": {
            "title": "FY2024 cash and equivalents",
            "description": "Year-end cash testing",
            "form_data": {
                "cash_balance": "1250.50",
                "preparer": "A. Reviewer",
                "period_end": "2025-01-15"
            },
            "files": ["bank-confirmation.pdf"]
        }
    });

    Ok(serde_json::from_value(fixture)?)
}
