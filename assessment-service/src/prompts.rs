//! Prompt templates for the assessment generator.
//!
//! Both templates are fixed text with the intake interpolated at the end. The
//! section list is part of the template, not derived from the input.

use crate::intake::{Intake, IntakeForm};
use serde_json::Value;

/// System instruction sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You generate structured security assessment text.";

const FIELDS_PREAMBLE: &str = "\
You are a senior security consultant. Based on the client's intake answers, write a concise,
clear **Business Security & Emergency Preparedness Assessment**.

Tone: professional, international English (no local slang). Avoid speculation; use best practices.

Structure (use markdown headings and lists):
1) Executive Summary (3–6 bullet points)
2) Organization Overview (2–4 sentences)
3) Current Security Posture (bullets)
4) Identified Risks & Gaps (bullets, prioritize)
5) Recommended Controls
   - Physical Security
   - Operational Procedures
   - Technology (CCTV/VMS, ACS, alarms, networking)
   - Emergency Preparedness & BCM
6) Quick-Win Actions (0–30 days)
7) Medium-Term Roadmap (30–180 days)
8) Notes & Assumptions
";

const ANSWERS_PREAMBLE: &str = "\
You are a professional security consultant. Review the client's questionnaire answers below
and write a clear, practical security risk report.

Tone: professional, international English. Base every finding on the answers given.

Structure (use markdown headings and lists):
1) Risk Summary
2) Key Vulnerabilities (bullets)
3) Recommended Actions (bullets, most urgent first)
4) Priority Level (Low / Medium / High / Critical, with a one-line justification)
";

/// Render the user prompt for a normalized intake.
pub fn build_prompt(intake: &Intake) -> String {
    match intake {
        Intake::Fields(form) => fields_prompt(form),
        Intake::Answers(answers) => answers_prompt(answers),
    }
}

fn fields_prompt(form: &IntakeForm) -> String {
    let mut prompt = String::with_capacity(FIELDS_PREAMBLE.len() + 512);
    prompt.push_str(FIELDS_PREAMBLE);
    prompt.push_str("\nClient data:\n");
    for (label, value) in form.labelled() {
        prompt.push_str("- ");
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(value);
        prompt.push('\n');
    }
    prompt
}

fn answers_prompt(answers: &Value) -> String {
    // Serializing a `Value` cannot fail; fall back to compact output anyway.
    let dump = serde_json::to_string_pretty(answers).unwrap_or_else(|_| answers.to_string());
    format!("{}\nClient answers (JSON):\n{}\n", ANSWERS_PREAMBLE, dump)
}
