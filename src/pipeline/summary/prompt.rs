use crate::models::Audience;

/// System preamble sent with every summary request.
pub const SYSTEM_PREAMBLE: &str = "You are a clinical summarization assistant. \
Always respond with valid JSON only, no additional text or formatting.";

const OCR_ANCHORS: &str = "Auto-correct obvious OCR errors: 120.9 g/dl → 12.09 g/dl, \
1764% → 76.4%, 329000 Jemm → 329,000 /cmm";

const PATIENT_FORMAT: &str = r#"PATIENT SUMMARY FORMAT:
1. Begin with a short introduction stating what the report is about (the disease or condition being tested)
2. List the important parameters with their values and give a short, simple explanation of what each means in everyday language
3. Keep the explanation friendly, reassuring and easy to understand. Avoid heavy medical jargon
4. At the end, provide a general suggestion (e.g. "consult your doctor for further advice", "maintain hydration", "this looks within normal range")
5. Before presenting, check whether any parameter value looks abrupt, invalid or unrealistic and handle it gracefully (e.g. flag it as "may need re-checking")"#;

const DOCTOR_FORMAT: &str = r#"DOCTOR SUMMARY FORMAT:
1. Start with the essential information a doctor may find useful (e.g. type of test, suspected condition)
2. Present all the important parameters with their values in a clear, structured way
3. No friendly explanations; keep it professional and concise
4. Mention any values that appear suspicious or need validation
5. Use proper medical terminology throughout"#;

/// JSON key holding the summary text for an audience.
pub fn summary_field(audience: Audience) -> &'static str {
    match audience {
        Audience::Patient => "patientSummary",
        Audience::Doctor => "doctorSummary",
    }
}

/// Build the summary prompt for one audience. The report text goes last, verbatim.
pub fn build_summary_prompt(report_text: &str, audience: Audience) -> String {
    let (title, format_spec) = match audience {
        Audience::Patient => ("Patient Summary", PATIENT_FORMAT),
        Audience::Doctor => ("Doctor Summary", DOCTOR_FORMAT),
    };
    let field = summary_field(audience);

    format!(
        r#"You are an AI assistant that generates medical report summaries. Create a {title} from this lab/diagnostic report.

{format_spec}

{OCR_ANCHORS}

Output ONLY valid JSON: {{ "{field}": "string", "flags": [{{"name": "string", "value": "string", "range": "string", "note": "string"}}] }}.

Report Text: {report_text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "12.09 g/dl Hemoglobin\n76.4% Neutrophils";

    #[test]
    fn report_text_is_appended_verbatim() {
        for audience in [Audience::Patient, Audience::Doctor] {
            let prompt = build_summary_prompt(REPORT, audience);
            assert!(prompt.ends_with(&format!("Report Text: {REPORT}")));
        }
    }

    #[test]
    fn patient_prompt_asks_for_patient_json() {
        let prompt = build_summary_prompt(REPORT, Audience::Patient);
        assert!(prompt.contains("Create a Patient Summary"));
        assert!(prompt.contains(r#"{ "patientSummary": "string", "flags": [{"name": "string""#));
        assert!(!prompt.contains("doctorSummary"));
        assert!(prompt.contains("everyday language"));
    }

    #[test]
    fn doctor_prompt_asks_for_doctor_json() {
        let prompt = build_summary_prompt(REPORT, Audience::Doctor);
        assert!(prompt.contains("Create a Doctor Summary"));
        assert!(prompt.contains(r#""doctorSummary": "string""#));
        assert!(!prompt.contains("patientSummary"));
        assert!(prompt.contains("medical terminology"));
    }

    #[test]
    fn both_prompts_have_five_numbered_points_and_anchors() {
        for audience in [Audience::Patient, Audience::Doctor] {
            let prompt = build_summary_prompt(REPORT, audience);
            for n in 1..=5 {
                assert!(prompt.contains(&format!("\n{n}. ")), "missing point {n}");
            }
            assert!(!prompt.contains("\n6. "));
            assert!(prompt.contains("120.9 g/dl → 12.09 g/dl"));
        }
    }

    #[test]
    fn braces_in_report_are_not_interpreted() {
        let prompt = build_summary_prompt("{odd} text", Audience::Patient);
        assert!(prompt.ends_with("Report Text: {odd} text"));
    }
}
