//! Post-OCR numeric correction of lab values.
//!
//! Scanned lab reports routinely lose decimal points or garble units
//! ("1209 gm/dl", "1764%", "329000 Jemm"). Each [`CorrectionRule`] is a pure
//! data descriptor: a pattern, the thresholds that decide how far to rescale
//! the captured number, and how to print the result. Rules run strictly in
//! the order of [`CORRECTION_RULES`]; later rules see the output of earlier
//! ones, so the unit clean-up literals sit at the end.
//!
//! This is heuristic and lossy. A value that was already right can be
//! rescaled (there is no ground truth to check against), and running the
//! corrector twice is not guaranteed to be stable.

use std::sync::LazyLock;

use regex::{Captures, Regex};

// ──────────────────────────────────────────────
// Rule descriptors
// ──────────────────────────────────────────────

/// How a rescaled number is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// At least one decimal place: `12.0`, `12.09`, `76.4`.
    Decimal,
    /// Shortest form: `329000`, `17.64`.
    Plain,
}

/// Where the label printed after a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Fixed(&'static str),
    /// Whatever the `label` capture group matched, case preserved.
    Captured,
}

/// Output shape of a rewritten lab value: `<number><unit> <label>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFormat {
    pub style: NumberStyle,
    /// Appended directly after the number, e.g. `" g/dl"` or `"%"`.
    pub unit: &'static str,
    pub label: Label,
}

impl ValueFormat {
    pub fn render(&self, value: f64, caps: &Captures) -> String {
        let label = match self.label {
            Label::Fixed(label) => label,
            Label::Captured => caps.name("label").map_or("", |m| m.as_str()),
        };
        format!("{}{} {}", format_number(value, self.style), self.unit, label)
    }
}

/// Divide by `divisor` when the value is strictly greater than `above`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleStep {
    pub above: f64,
    pub divisor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rewrite {
    /// Parse the `value` group, apply the first matching step, print with `format`.
    /// A value no step applies to is printed unchanged.
    Rescale {
        steps: &'static [ScaleStep],
        format: ValueFormat,
    },
    /// Replace the whole match.
    Literal(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub rewrite: Rewrite,
}

const HEMOGLOBIN_STEPS: &[ScaleStep] = &[
    ScaleStep { above: 200.0, divisor: 100.0 },
    ScaleStep { above: 20.0, divisor: 10.0 },
];

const PERCENT_STEPS: &[ScaleStep] = &[
    ScaleStep { above: 1000.0, divisor: 100.0 },
    ScaleStep { above: 100.0, divisor: 10.0 },
];

const PLATELET_STEPS: &[ScaleStep] = &[
    ScaleStep { above: 10_000_000.0, divisor: 100.0 },
    ScaleStep { above: 1_000_000.0, divisor: 10.0 },
];

const WBC_STEPS: &[ScaleStep] = &[
    ScaleStep { above: 100_000.0, divisor: 1000.0 },
    ScaleStep { above: 50_000.0, divisor: 100.0 },
];

const HEMOGLOBIN_FORMAT: ValueFormat = ValueFormat {
    style: NumberStyle::Decimal,
    unit: " g/dl",
    label: Label::Fixed("Hemoglobin"),
};

const PERCENT_FORMAT: ValueFormat = ValueFormat {
    style: NumberStyle::Decimal,
    unit: "%",
    label: Label::Captured,
};

const PLATELET_FORMAT: ValueFormat = ValueFormat {
    style: NumberStyle::Plain,
    unit: " /cmm",
    label: Label::Fixed("Platelets"),
};

const WBC_FORMAT: ValueFormat = ValueFormat {
    style: NumberStyle::Plain,
    unit: " /cmm",
    label: Label::Fixed("WBC"),
};

/// Every correction, in application order.
pub const CORRECTION_RULES: &[CorrectionRule] = &[
    CorrectionRule {
        name: "hemoglobin_value_first",
        pattern: r"(?i)(?P<value>\d{3,4})\.?\d? ?gm?/dl.*?hemoglobin",
        rewrite: Rewrite::Rescale { steps: HEMOGLOBIN_STEPS, format: HEMOGLOBIN_FORMAT },
    },
    CorrectionRule {
        name: "hemoglobin_label_first",
        pattern: r"(?i)hemoglobin[ \t]*[:=-]?[ \t]*(?P<value>\d{3,4})\.?\d? ?gm?/dl",
        rewrite: Rewrite::Rescale { steps: HEMOGLOBIN_STEPS, format: HEMOGLOBIN_FORMAT },
    },
    CorrectionRule {
        name: "differential_value_first",
        pattern: r"(?i)(?P<value>\d{3,4})%.*?(?P<label>neutrophils?|lymphocytes?|monocytes?|eosinophils?|basophils?)",
        rewrite: Rewrite::Rescale { steps: PERCENT_STEPS, format: PERCENT_FORMAT },
    },
    CorrectionRule {
        name: "differential_label_first",
        pattern: r"(?i)(?P<label>neutrophils?|lymphocytes?|monocytes?|eosinophils?|basophils?)[ \t]*[:=-]?[ \t]*(?P<value>\d{3,4})%",
        rewrite: Rewrite::Rescale { steps: PERCENT_STEPS, format: PERCENT_FORMAT },
    },
    CorrectionRule {
        name: "platelets_value_first",
        pattern: r"(?i)(?P<value>\d+)\s*(?:j ?emm?|j/cmm|cells?/cmm).*?platelets?",
        rewrite: Rewrite::Rescale { steps: PLATELET_STEPS, format: PLATELET_FORMAT },
    },
    CorrectionRule {
        name: "platelets_label_first",
        pattern: r"(?i)platelets?(?: count)?[ \t]*[:=-]?[ \t]*(?P<value>\d+)\s*(?:j ?emm?|j/cmm|cells?/cmm)",
        rewrite: Rewrite::Rescale { steps: PLATELET_STEPS, format: PLATELET_FORMAT },
    },
    CorrectionRule {
        name: "wbc_value_first",
        pattern: r"(?i)(?P<value>\d+)\s*(?:cells?/cmm|/?cmm).*?(?:wbc|white.*?blood.*?cell)",
        rewrite: Rewrite::Rescale { steps: WBC_STEPS, format: WBC_FORMAT },
    },
    CorrectionRule {
        name: "wbc_label_first",
        pattern: r"(?i)(?:wbc|white blood cells?)(?: count)?[ \t]*[:=-]?[ \t]*(?P<value>\d+)\s*(?:cells?/cmm|/?cmm)",
        rewrite: Rewrite::Rescale { steps: WBC_STEPS, format: WBC_FORMAT },
    },
    CorrectionRule {
        name: "unit_gm_dl",
        pattern: r"(?i)gm/dl",
        rewrite: Rewrite::Literal("g/dl"),
    },
    CorrectionRule {
        name: "unit_mg_dl",
        pattern: r"(?i)mg/dl",
        rewrite: Rewrite::Literal("mg/dl"),
    },
    CorrectionRule {
        name: "unit_jemm",
        pattern: r"(?i)j ?emm?\b",
        rewrite: Rewrite::Literal("/cmm"),
    },
    CorrectionRule {
        name: "unit_j_cmm",
        pattern: r"(?i)j/cmm",
        rewrite: Rewrite::Literal("/cmm"),
    },
    CorrectionRule {
        name: "unit_cells_cmm",
        pattern: r"(?i)cells?[/ ]cmm",
        rewrite: Rewrite::Literal("/cmm"),
    },
];

// ──────────────────────────────────────────────
// Compiled rules
// ──────────────────────────────────────────────

struct CompiledRule {
    rule: &'static CorrectionRule,
    regex: Regex,
}

impl CompiledRule {
    fn apply(&self, text: &str) -> String {
        match self.rule.rewrite {
            Rewrite::Literal(replacement) => self
                .regex
                .replace_all(text, regex::NoExpand(replacement))
                .into_owned(),
            Rewrite::Rescale { steps, format } => self
                .regex
                .replace_all(text, |caps: &Captures| {
                    match caps.name("value").and_then(|m| m.as_str().parse::<f64>().ok()) {
                        Some(value) => format.render(rescale(value, steps), caps),
                        None => caps[0].to_string(),
                    }
                })
                .into_owned(),
        }
    }
}

static COMPILED_RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    CORRECTION_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            regex: Regex::new(rule.pattern).expect("correction rule pattern must compile"),
        })
        .collect()
});

// ──────────────────────────────────────────────
// Public API
// ──────────────────────────────────────────────

/// Apply every correction rule, in order, to raw OCR text.
pub fn correct_lab_values(text: &str) -> String {
    COMPILED_RULES
        .iter()
        .fold(text.to_string(), |acc, compiled| compiled.apply(&acc))
}

/// Apply a single named rule. `None` if no rule has that name.
pub fn apply_rule(name: &str, text: &str) -> Option<String> {
    COMPILED_RULES
        .iter()
        .find(|compiled| compiled.rule.name == name)
        .map(|compiled| compiled.apply(text))
}

/// Divide by the first step whose threshold the value exceeds.
pub fn rescale(value: f64, steps: &[ScaleStep]) -> f64 {
    steps
        .iter()
        .find(|step| value > step.above)
        .map_or(value, |step| value / step.divisor)
}

/// Print a corrected number. Rounded to 4 decimals first so float noise from
/// the rescaling never reaches the text.
pub fn format_number(value: f64, style: NumberStyle) -> String {
    let value = (value * 10_000.0).round() / 10_000.0;
    match style {
        NumberStyle::Decimal if value.fract() == 0.0 => format!("{value:.1}"),
        _ => format!("{value}"),
    }
}
