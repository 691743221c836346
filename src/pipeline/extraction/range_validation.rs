//! Physiological range sanity pass.
//!
//! Runs after [`super::lab_correction`]. For each known lab value, a number
//! found next to its name that sits orders of magnitude outside the normal
//! range is rescaled: above 100× the maximum it is divided by 100, above 10×
//! the maximum by 10, below a tenth of the minimum it is multiplied by 10.
//! Values within those bounds are left exactly as written.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::lab_correction::{Label, NumberStyle, ValueFormat};

/// Expected range for one named lab value, with the patterns that find it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabRange {
    pub name: &'static str,
    /// Each pattern must capture the number in a `value` group.
    pub patterns: &'static [&'static str],
    pub min_normal: f64,
    pub max_normal: f64,
    pub format: ValueFormat,
}

impl LabRange {
    /// The adjusted value, or `None` when it is plausible as written.
    pub fn adjust(&self, value: f64) -> Option<f64> {
        if value > self.max_normal * 100.0 {
            Some(value / 100.0)
        } else if value > self.max_normal * 10.0 {
            Some(value / 10.0)
        } else if value < self.min_normal / 10.0 {
            Some(value * 10.0)
        } else {
            None
        }
    }
}

pub const LAB_RANGES: &[LabRange] = &[
    LabRange {
        name: "hemoglobin",
        patterns: &[
            r"(?i)(?P<value>\d+(?:\.\d+)?)\s*g?/dl.*?hemoglobin",
            r"(?i)hemoglobin[ \t]*[:=-]?[ \t]*(?P<value>\d+(?:\.\d+)?)\s*g?/dl",
        ],
        min_normal: 12.0,
        max_normal: 16.0,
        format: ValueFormat {
            style: NumberStyle::Decimal,
            unit: " g/dl",
            label: Label::Fixed("Hemoglobin"),
        },
    },
    LabRange {
        name: "neutrophils",
        patterns: &[
            r"(?i)(?P<value>\d+(?:\.\d+)?)%.*?neutrophils?",
            r"(?i)neutrophils?[ \t]*[:=-]?[ \t]*(?P<value>\d+(?:\.\d+)?)%",
        ],
        min_normal: 40.0,
        max_normal: 70.0,
        format: ValueFormat {
            style: NumberStyle::Decimal,
            unit: "%",
            label: Label::Fixed("Neutrophils"),
        },
    },
    LabRange {
        name: "platelets",
        patterns: &[
            r"(?i)(?P<value>\d+)\s*/cmm.*?platelets?",
            r"(?i)platelets?(?: count)?[ \t]*[:=-]?[ \t]*(?P<value>\d+)\s*/cmm",
        ],
        min_normal: 150_000.0,
        max_normal: 450_000.0,
        format: ValueFormat {
            style: NumberStyle::Plain,
            unit: " /cmm",
            label: Label::Fixed("Platelets"),
        },
    },
];

struct CompiledRange {
    range: &'static LabRange,
    regexes: Vec<Regex>,
}

static COMPILED_RANGES: LazyLock<Vec<CompiledRange>> = LazyLock::new(|| {
    LAB_RANGES
        .iter()
        .map(|range| CompiledRange {
            range,
            regexes: range
                .patterns
                .iter()
                .map(|p| Regex::new(p).expect("lab range pattern must compile"))
                .collect(),
        })
        .collect()
});

impl CompiledRange {
    fn apply(&self, text: &str) -> String {
        self.regexes.iter().fold(text.to_string(), |acc, regex| {
            regex
                .replace_all(&acc, |caps: &Captures| {
                    let adjusted = caps
                        .name("value")
                        .and_then(|m| m.as_str().parse::<f64>().ok())
                        .and_then(|v| self.range.adjust(v));
                    match adjusted {
                        Some(value) => self.range.format.render(value, caps),
                        None => caps[0].to_string(),
                    }
                })
                .into_owned()
        })
    }
}

/// Rescale implausible values for every entry in [`LAB_RANGES`], in order.
pub fn validate_lab_ranges(text: &str) -> String {
    COMPILED_RANGES
        .iter()
        .fold(text.to_string(), |acc, compiled| compiled.apply(&acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(name: &str) -> &'static LabRange {
        LAB_RANGES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn all_patterns_compile() {
        let total: usize = COMPILED_RANGES.iter().map(|c| c.regexes.len()).sum();
        let expected: usize = LAB_RANGES.iter().map(|r| r.patterns.len()).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn plausible_values_left_verbatim() {
        let text = "12.09 g/dl Hemoglobin\n76.4% neutrophils\n329000 /cmm Platelets";
        assert_eq!(validate_lab_ranges(text), text);
    }

    #[test]
    fn hundredfold_checked_before_tenfold() {
        // 1700 is above both 160 and 1600; the larger divisor must win.
        assert_eq!(
            validate_lab_ranges("1700 g/dl hemoglobin"),
            "17.0 g/dl Hemoglobin"
        );
        assert_eq!(range("hemoglobin").adjust(1700.0), Some(17.0));
    }

    #[test]
    fn tenfold_high_divided_by_10() {
        assert_eq!(
            validate_lab_ranges("Hemoglobin 175 g/dl"),
            "17.5 g/dl Hemoglobin"
        );
        assert_eq!(
            validate_lab_ranges("800% neutrophils"),
            "80.0% Neutrophils"
        );
    }

    #[test]
    fn tenfold_low_multiplied_by_10() {
        assert_eq!(
            validate_lab_ranges("Hemoglobin 0.9 g/dl"),
            "9.0 g/dl Hemoglobin"
        );
        assert_eq!(
            validate_lab_ranges("12000 /cmm Platelets"),
            "120000 /cmm Platelets"
        );
    }

    #[test]
    fn platelets_far_above_range() {
        assert_eq!(
            validate_lab_ranges("Platelet count 50000000 /cmm"),
            "500000 /cmm Platelets"
        );
    }

    #[test]
    fn mg_dl_is_not_hemoglobin_unit() {
        let text = "Glucose 950 mg/dl Hemoglobin 13 g/dl";
        assert_eq!(validate_lab_ranges(text), text);
    }

    #[test]
    fn adjust_boundaries() {
        let hb = range("hemoglobin");
        assert_eq!(hb.adjust(160.0), None);
        assert_eq!(hb.adjust(1600.0), Some(160.0));
        assert_eq!(hb.adjust(1.2), None);
        assert_eq!(hb.adjust(1.0), Some(10.0));
    }
}
