//! Summary response parsing.
//!
//! Model replies are asked to be bare JSON but often arrive fenced, prefixed
//! with chatter, or followed by trailing text. [`parse_summary_response`] runs
//! an ordered chain of recovery strategies; the first one that yields a
//! summary wins. When none does, a fixed per-audience text is used, so
//! content problems never surface as errors.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::prompt::summary_field;
use super::types::{AudienceSummary, RecoveryTier};
use crate::models::{Audience, SummaryFlag};

/// Words that make a non-JSON reply worth quoting. Matched case-sensitively.
pub const EXCERPT_KEYWORDS: &[&str] = &["hemoglobin", "blood", "test"];

/// Characters of the raw reply quoted by the excerpt strategy.
pub const EXCERPT_CHARS: usize = 300;

pub const PATIENT_FALLBACK: &str = "Your medical report has been processed. Please discuss \
the results with your healthcare provider for proper interpretation and next steps.";

pub const DOCTOR_FALLBACK: &str = "Medical report analysis completed. Clinical review \
recommended for proper assessment and patient management decisions.";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?").expect("code fence pattern must compile"));

type Strategy = fn(&str, Audience) -> Option<AudienceSummary>;

/// Recovery strategies in the order they are tried.
const RECOVERY_CHAIN: &[(RecoveryTier, Strategy)] = &[
    (RecoveryTier::Structured, parse_structured),
    (RecoveryTier::Excerpt, quote_excerpt),
];

/// Parse one provider reply for `audience`. Never fails.
pub fn parse_summary_response(raw: &str, audience: Audience) -> AudienceSummary {
    let content = raw.trim();

    let (tier, summary) = RECOVERY_CHAIN
        .iter()
        .find_map(|(tier, strategy)| strategy(content, audience).map(|s| (*tier, s)))
        .unwrap_or_else(|| (RecoveryTier::Fallback, fallback_summary(audience)));

    if tier != RecoveryTier::Structured {
        tracing::warn!(
            audience = audience.as_str(),
            tier = tier.as_str(),
            response_chars = content.chars().count(),
            "Summary response was not valid JSON, degraded"
        );
    }
    summary
}

// ──────────────────────────────────────────────
// Strategies
// ──────────────────────────────────────────────

/// Strip code fences, drop everything before the first `{` and after the
/// last `}`. `None` when no object-looking span remains.
pub fn extract_json_candidate(content: &str) -> Option<String> {
    let unfenced = CODE_FENCE.replace_all(content, "");
    let unfenced = unfenced.trim();
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    Some(unfenced[start..=end].to_string())
}

fn parse_structured(content: &str, audience: Audience) -> Option<AudienceSummary> {
    let candidate = extract_json_candidate(content)?;
    let value: Value = serde_json::from_str(&candidate).ok()?;
    let object = value.as_object()?;

    let summary = object
        .get(summary_field(audience))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())?;

    Some(AudienceSummary {
        audience,
        summary: summary.to_string(),
        flags: parse_flags_lenient(object.get("flags")),
        tier: RecoveryTier::Structured,
    })
}

fn quote_excerpt(content: &str, audience: Audience) -> Option<AudienceSummary> {
    if !EXCERPT_KEYWORDS.iter().any(|k| content.contains(k)) {
        return None;
    }

    let lead_in = match audience {
        Audience::Patient => "Based on your blood test results: ",
        Audience::Doctor => "Clinical findings: ",
    };
    let excerpt: String = content.chars().take(EXCERPT_CHARS).collect();

    Some(AudienceSummary {
        audience,
        summary: format!("{lead_in}{excerpt}..."),
        flags: vec![],
        tier: RecoveryTier::Excerpt,
    })
}

fn fallback_summary(audience: Audience) -> AudienceSummary {
    let summary = match audience {
        Audience::Patient => PATIENT_FALLBACK,
        Audience::Doctor => DOCTOR_FALLBACK,
    };
    AudienceSummary {
        audience,
        summary: summary.to_string(),
        flags: vec![],
        tier: RecoveryTier::Fallback,
    }
}

// ──────────────────────────────────────────────
// Flags
// ──────────────────────────────────────────────

/// Anything other than an array yields no flags. Non-object items are skipped.
fn parse_flags_lenient(flags: Option<&Value>) -> Vec<SummaryFlag> {
    let Some(Value::Array(items)) = flags else {
        return vec![];
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|flag| SummaryFlag {
            name: flag_text(flag.get("name")),
            value: flag_text(flag.get("value")),
            range: flag_text(flag.get("range")),
            note: flag_text(flag.get("note")),
        })
        .collect()
}

fn flag_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json() {
        let raw = r#"{"patientSummary": "Your blood count looks healthy.", "flags": []}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Structured);
        assert_eq!(parsed.summary, "Your blood count looks healthy.");
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn markdown_fenced_json() {
        let raw = "```json\n{\"doctorSummary\": \"CBC: Hb 12.09 g/dl.\", \"flags\": [{\"name\": \"Hemoglobin\", \"value\": \"12.09 g/dl\", \"range\": \"12-16 g/dl\", \"note\": \"low normal\"}]}\n```";
        let parsed = parse_summary_response(raw, Audience::Doctor);
        assert_eq!(parsed.tier, RecoveryTier::Structured);
        assert_eq!(parsed.summary, "CBC: Hb 12.09 g/dl.");
        assert_eq!(
            parsed.flags,
            vec![SummaryFlag {
                name: "Hemoglobin".into(),
                value: "12.09 g/dl".into(),
                range: "12-16 g/dl".into(),
                note: "low normal".into(),
            }]
        );
    }

    #[test]
    fn leading_chatter_and_trailing_garbage() {
        let raw = "Sure! Here is the JSON:\n{\"patientSummary\": \"All good.\"}\nLet me know if you need more. }{";
        // The trailing "}{" still leaves a parseable span ending at the last "}".
        assert!(extract_json_candidate(raw).is_some());

        let raw = "Here you go: {\"patientSummary\": \"All good.\", \"flags\": []} -- end";
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Structured);
        assert_eq!(parsed.summary, "All good.");
    }

    #[test]
    fn wrong_audience_field_degrades() {
        let raw = r#"{"doctorSummary": "Clinical note.", "flags": []}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Fallback);
        assert_eq!(parsed.summary, PATIENT_FALLBACK);
    }

    #[test]
    fn empty_summary_field_degrades() {
        let raw = r#"{"patientSummary": "   ", "flags": []}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_ne!(parsed.tier, RecoveryTier::Structured);
    }

    #[test]
    fn summary_text_kept_verbatim() {
        let raw = r#"{"patientSummary": "  Your results look normal.\n", "flags": []}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Structured);
        assert_eq!(parsed.summary, "  Your results look normal.\n");
    }

    #[test]
    fn non_array_flags_become_empty() {
        let raw = r#"{"patientSummary": "Fine.", "flags": "none"}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Structured);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn flags_are_coerced_leniently() {
        let raw = r#"{"patientSummary": "Fine.", "flags": [
            "not an object",
            {"name": "Platelets", "value": 329000, "range": null},
            {"name": "WBC", "value": "860 /cmm", "range": "4000-11000", "note": "low"}
        ]}"#;
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.flags.len(), 2);
        assert_eq!(parsed.flags[0].name, "Platelets");
        assert_eq!(parsed.flags[0].value, "329000");
        assert_eq!(parsed.flags[0].range, "");
        assert_eq!(parsed.flags[0].note, "");
        assert_eq!(parsed.flags[1].note, "low");
    }

    #[test]
    fn unparseable_with_blood_keyword_quotes_excerpt() {
        let raw = "The blood panel shows mild anemia { not json";
        let parsed = parse_summary_response(raw, Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Excerpt);
        assert_eq!(
            parsed.summary,
            "Based on your blood test results: The blood panel shows mild anemia { not json..."
        );
        assert!(parsed.flags.is_empty());

        let parsed = parse_summary_response(raw, Audience::Doctor);
        assert!(parsed.summary.starts_with("Clinical findings: The blood panel"));
    }

    #[test]
    fn keyword_match_is_case_sensitive() {
        let parsed = parse_summary_response("HEMOGLOBIN is normal", Audience::Doctor);
        assert_eq!(parsed.tier, RecoveryTier::Fallback);
        assert_eq!(parsed.summary, DOCTOR_FALLBACK);

        let parsed = parse_summary_response("Hemoglobin reading unclear", Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Fallback);
        assert_eq!(parsed.summary, PATIENT_FALLBACK);

        let parsed = parse_summary_response("hemoglobin reading unclear", Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Excerpt);
    }

    #[test]
    fn excerpt_is_capped_at_300_chars() {
        let raw = format!("test {}", "é".repeat(400));
        let parsed = parse_summary_response(&raw, Audience::Patient);
        let lead_in = "Based on your blood test results: ";
        let quoted = parsed
            .summary
            .strip_prefix(lead_in)
            .and_then(|s| s.strip_suffix("..."))
            .unwrap();
        assert_eq!(quoted.chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn no_keywords_gives_fixed_fallback() {
        let parsed = parse_summary_response("I cannot help with that.", Audience::Patient);
        assert_eq!(parsed.tier, RecoveryTier::Fallback);
        assert_eq!(parsed.summary, PATIENT_FALLBACK);

        let parsed = parse_summary_response("", Audience::Doctor);
        assert_eq!(parsed.summary, DOCTOR_FALLBACK);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn candidate_requires_braces_in_order() {
        assert_eq!(extract_json_candidate("no braces"), None);
        assert_eq!(extract_json_candidate("} backwards {"), None);
        assert_eq!(
            extract_json_candidate("```\n{\"a\": 1}\n```").as_deref(),
            Some("{\"a\": 1}")
        );
    }
}
