//! Reviewer-facing decision reports.
//!
//! A report combines one applicant's decision record with its attribution
//! bundle and, for borderline decisions, the classified risk archetype with
//! its review guidance. Rendering targets are an ASCII table for terminal
//! display and Markdown for case notes.

use hobart_decision::{AttributionBundle, Band, DecisionRecord, RiskType};
use serde::{Deserialize, Serialize};
use std::fmt;

const RULE_WIDTH: usize = 72;

/// A complete decision report for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    /// The scored decision.
    pub record: DecisionRecord,

    /// Top attribution drivers and super-group shares.
    pub bundle: AttributionBundle,

    /// Risk archetype, present only for `Review` decisions.
    pub risk_type: Option<RiskType>,
}

impl DecisionReport {
    /// Build a report. Any risk type supplied for a non-Review decision is
    /// dropped, since review guidance only applies to borderline cases.
    pub fn new(
        record: DecisionRecord,
        bundle: AttributionBundle,
        risk_type: Option<RiskType>,
    ) -> Self {
        let risk_type = if record.band == Band::Review {
            risk_type
        } else {
            None
        };
        Self {
            record,
            bundle,
            risk_type,
        }
    }

    /// Format as an ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nDecision Report: applicant {}\n",
            self.record.applicant_id
        ));
        output.push_str(&format!("Scored at: {}\n", self.record.scored_at));
        output.push_str(&"=".repeat(RULE_WIDTH));
        output.push('\n');

        output.push_str("\nDecision:\n");
        output.push_str(&"-".repeat(RULE_WIDTH));
        output.push('\n');
        output.push_str(&format!("  Score:        {:.1}\n", self.record.score));
        output.push_str(&format!("  Band:         {}\n", self.record.band));
        output.push_str(&format!("  Grade:        {}\n", self.record.grade));
        output.push_str(&format!("  PD:           {:.4}\n", self.record.pd));
        output.push_str(&format!(
            "  Margin:       {:+.1} vs cutoff {:.0}\n",
            self.record.margin, self.record.cutoff
        ));

        if !self.bundle.items.is_empty() {
            output.push_str("\nTop Drivers:\n");
            output.push_str(&"-".repeat(RULE_WIDTH));
            output.push('\n');
            output.push_str(&format!(
                "{:<34} {:>10} {:>9} {:>8}\n",
                "Driver", "Value", "% of mass", "Raw"
            ));
            output.push_str(&"-".repeat(RULE_WIDTH));
            output.push('\n');
            for item in &self.bundle.items {
                let raw = item
                    .raw_value
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
                output.push_str(&format!(
                    "{:<34} {:>+10.4} {:>8.1}% {:>8}\n",
                    item.label, item.value, item.pct_of_top_k, raw
                ));
            }
        }

        if !self.bundle.group_pct.is_empty() {
            output.push_str("\nSuper-Group Summary:\n");
            output.push_str(&"-".repeat(RULE_WIDTH));
            output.push('\n');
            for (group, pct) in &self.bundle.group_pct {
                output.push_str(&format!("  {:<34} {:>6.1}%\n", group.to_string(), pct));
            }
        }

        if let Some(risk_type) = self.risk_type {
            output.push_str("\nReview Guidance:\n");
            output.push_str(&"-".repeat(RULE_WIDTH));
            output.push('\n');
            output.push_str(&format!("  Risk type: {}\n", risk_type.name()));
            output.push_str(&format!("  {}\n", risk_type.description()));
            output.push_str("  Checklist:\n");
            for item in risk_type.checklist() {
                output.push_str(&format!("    - {item}\n"));
            }
            output.push_str("  Suggested actions:\n");
            for action in risk_type.actions() {
                output.push_str(&format!("    - {action}\n"));
            }
        }

        output.push_str(&"=".repeat(RULE_WIDTH));
        output.push('\n');

        output
    }

    /// Format as Markdown for case notes.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# Decision Report: applicant {}\n\n",
            self.record.applicant_id
        ));
        output.push_str(&format!("**Scored at:** {}\n\n", self.record.scored_at));

        output.push_str("## Decision\n\n");
        output.push_str(&format!("- **Score:** {:.1}\n", self.record.score));
        output.push_str(&format!("- **Band:** {}\n", self.record.band));
        output.push_str(&format!("- **Grade:** {}\n", self.record.grade));
        output.push_str(&format!("- **PD:** {:.4}\n", self.record.pd));
        output.push_str(&format!(
            "- **Margin:** {:+.1} vs cutoff {:.0}\n\n",
            self.record.margin, self.record.cutoff
        ));

        if !self.bundle.items.is_empty() {
            output.push_str("## Top Drivers\n\n");
            output.push_str("| Driver | Group | Value | % of mass | Raw |\n");
            output.push_str("|--------|-------|-------|-----------|-----|\n");
            for item in &self.bundle.items {
                let raw = item
                    .raw_value
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
                output.push_str(&format!(
                    "| {} | {} | {:+.4} | {:.1}% | {} |\n",
                    item.label, item.group, item.value, item.pct_of_top_k, raw
                ));
            }
            output.push('\n');
        }

        if !self.bundle.group_pct.is_empty() {
            output.push_str("## Super-Group Summary\n\n");
            for (group, pct) in &self.bundle.group_pct {
                output.push_str(&format!("- **{group}:** {pct:.1}%\n"));
            }
            output.push('\n');
        }

        if let Some(risk_type) = self.risk_type {
            output.push_str("## Review Guidance\n\n");
            output.push_str(&format!("**Risk type:** {}\n\n", risk_type.name()));
            output.push_str(&format!("{}\n\n", risk_type.description()));
            output.push_str("**Checklist:**\n\n");
            for item in risk_type.checklist() {
                output.push_str(&format!("- {item}\n"));
            }
            output.push_str("\n**Suggested actions:**\n\n");
            for action in risk_type.actions() {
                output.push_str(&format!("- {action}\n"));
            }
        }

        output
    }
}

impl fmt::Display for DecisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "applicant {}: {} (score {:.1}, grade {}, margin {:+.1})",
            self.record.applicant_id,
            self.record.band,
            self.record.score,
            self.record.grade,
            self.record.margin
        )
    }
}
