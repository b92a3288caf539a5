use super::super::domain::{Finding, FindingStatus};

/// Fixed compliance bands used to pick the conclusion prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceTier {
    High,
    Moderate,
    Partial,
    Limited,
}

impl ComplianceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::High
        } else if score >= 70.0 {
            Self::Moderate
        } else if score >= 50.0 {
            Self::Partial
        } else {
            Self::Limited
        }
    }

    pub const fn conclusion(self) -> &'static str {
        match self {
            Self::High => "The work papers demonstrate a high level of compliance with established audit criteria. The documentation is substantially complete and accurate, with minimal exceptions noted.",
            Self::Moderate => "The work papers demonstrate moderate compliance with established audit criteria. While the majority of requirements are met, certain areas require attention to achieve full compliance.",
            Self::Partial => "The work papers demonstrate partial compliance with established audit criteria. Significant deficiencies were identified that require remediation to ensure proper compliance.",
            Self::Limited => "The work papers demonstrate limited compliance with established audit criteria. Substantial deficiencies were identified that require immediate and comprehensive remediation.",
        }
    }
}

pub(crate) struct NarrativeInput<'a> {
    pub score: f64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub findings: &'a [Finding],
}

pub(crate) fn render(input: &NarrativeInput<'_>) -> String {
    let mut narrative = String::from("**AUDIT CONCLUSION REPORT**\n\n");
    narrative.push_str(&format!(
        "**Overall Compliance Score: {:.2}%**\n\n",
        input.score
    ));

    narrative.push_str("**Executive Summary:**\n");
    narrative.push_str(&format!(
        "This audit evaluated {} attributes against the submitted work papers. Of the attributes evaluated, {} passed, {} failed, and {} generated warnings.\n\n",
        input.total, input.passed, input.failed, input.warnings
    ));

    let tier = ComplianceTier::from_score(input.score);
    narrative.push_str(&format!("**Conclusion:** {}\n\n", tier.conclusion()));

    if input.failed > 0 || input.warnings > 0 {
        narrative.push_str("**Detailed Findings:**\n\n");
        for finding in input
            .findings
            .iter()
            .filter(|finding| finding.status != FindingStatus::Pass)
        {
            push_finding(&mut narrative, finding);
        }
    }

    narrative.push_str("**Recommendations:**\n");
    let mut recommendations = Vec::new();
    if input.failed > 0 {
        recommendations.push("Address all failed attributes promptly to improve compliance.");
    }
    if input.warnings > 0 {
        recommendations
            .push("Review and resolve warning conditions to enhance documentation quality.");
    }
    if input.score < 90.0 {
        recommendations.push(
            "Implement additional controls and validation procedures to prevent future non-compliance.",
        );
    }
    for (index, recommendation) in recommendations.iter().enumerate() {
        narrative.push_str(&format!("{}. {}\n", index + 1, recommendation));
    }

    if tier == ComplianceTier::High {
        narrative.push_str("\n**Final Assessment:** The work papers are acceptable for audit purposes with minor recommendations for improvement.");
    } else {
        narrative.push_str("\n**Final Assessment:** The work papers require revision and resubmission to meet audit standards.");
    }

    narrative
}

fn push_finding(narrative: &mut String, finding: &Finding) {
    let marker = if finding.status == FindingStatus::Fail {
        "❌"
    } else {
        "⚠️"
    };
    narrative.push_str(&format!(
        "{marker} **{}** ({})\n",
        finding.attribute_name,
        finding.status.label().to_uppercase()
    ));
    narrative.push_str(&format!(
        "   Details: {}\n",
        finding.details.as_deref().unwrap_or("None")
    ));
    if let Some(recommendation) = finding
        .recommendation
        .as_deref()
        .filter(|text| !text.is_empty())
    {
        narrative.push_str(&format!("   Recommendation: {recommendation}\n"));
    }
    narrative.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_fixed_bands() {
        assert_eq!(ComplianceTier::from_score(100.0), ComplianceTier::High);
        assert_eq!(ComplianceTier::from_score(90.0), ComplianceTier::High);
        assert_eq!(ComplianceTier::from_score(89.99), ComplianceTier::Moderate);
        assert_eq!(ComplianceTier::from_score(70.0), ComplianceTier::Moderate);
        assert_eq!(ComplianceTier::from_score(69.99), ComplianceTier::Partial);
        assert_eq!(ComplianceTier::from_score(50.0), ComplianceTier::Partial);
        assert_eq!(ComplianceTier::from_score(49.99), ComplianceTier::Limited);
        assert_eq!(ComplianceTier::from_score(0.0), ComplianceTier::Limited);
    }

    #[test]
    fn recommendations_are_numbered_in_order_present() {
        let text = render(&NarrativeInput {
            score: 80.0,
            total: 5,
            passed: 4,
            failed: 0,
            warnings: 1,
            findings: &[],
        });

        assert!(text.contains(
            "1. Review and resolve warning conditions to enhance documentation quality."
        ));
        assert!(text.contains("2. Implement additional controls"));
        assert!(!text.contains("3. "));
    }

    #[test]
    fn clean_high_score_has_no_recommendation_items() {
        let text = render(&NarrativeInput {
            score: 100.0,
            total: 2,
            passed: 2,
            failed: 0,
            warnings: 0,
            findings: &[],
        });

        assert!(text.ends_with(
            "**Recommendations:**\n\n**Final Assessment:** The work papers are acceptable for audit purposes with minor recommendations for improvement."
        ));
        assert!(!text.contains("**Detailed Findings:**"));
    }
}
