use super::super::domain::{Attribute, Finding, FindingStatus, WorkPaper};

/// Checklist items are judged on uploaded document presence only; file contents are not inspected.
pub(crate) fn evaluate_checklist(
    work_paper: &WorkPaper,
    attribute: &Attribute,
    criteria_text: &str,
    is_required: bool,
) -> Finding {
    let finding = Finding::pass(attribute);
    let uploaded = work_paper.file_paths.len();

    match (is_required, uploaded) {
        (true, 0) => finding
            .with_status(FindingStatus::Fail)
            .with_details(format!(
                "Required checklist item '{criteria_text}' not satisfied - no files uploaded"
            ))
            .with_recommendation(format!(
                "Upload supporting documentation for '{criteria_text}'"
            )),
        (true, count) => finding.with_details(format!(
            "Checklist item '{criteria_text}' satisfied - {count} file(s) uploaded"
        )),
        (false, count) => {
            let status = if count > 0 {
                FindingStatus::Pass
            } else {
                FindingStatus::Warning
            };
            finding.with_status(status).with_details(format!(
                "Checklist item '{criteria_text}' - {count} file(s) uploaded"
            ))
        }
    }
}
