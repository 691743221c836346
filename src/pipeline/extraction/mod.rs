pub mod lab_correction;
pub mod range_validation;
pub mod ocr_space;

pub use lab_correction::*;
pub use range_validation::*;
pub use ocr_space::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{0}")]
    Configuration(String),

    #[error("OCR provider returned error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("{0}")]
    EmptyResult(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),
}

/// Image-to-text service abstraction (allows mocking).
pub trait OcrProvider: Send + Sync {
    /// Extract the text of the image at `image_url`, trimmed and non-empty.
    fn extract(&self, image_url: &str) -> Result<String, ExtractionError>;
}

/// Full post-OCR normalization: numeric correction, then range validation.
pub fn normalize_lab_text(text: &str) -> String {
    validate_lab_ranges(&correct_lab_values(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_runs_corrector_then_validator() {
        assert_eq!(
            normalize_lab_text("Hemoglobin 1209 gm/dl"),
            "12.09 g/dl Hemoglobin"
        );
    }

    #[test]
    fn validator_catches_what_corrector_leaves() {
        // 3% is below every corrector threshold and under a tenth of the normal minimum.
        assert_eq!(
            normalize_lab_text("Neutrophils 3%"),
            "30.0% Neutrophils"
        );
    }

    #[test]
    fn mixed_report() {
        let raw = "Hemoglobin 1209 gm/dl\nNeutrophils 764%\n32900000 Jemm Platelets\n86000 cmm WBC";
        assert_eq!(
            normalize_lab_text(raw),
            "12.09 g/dl Hemoglobin\n76.4% Neutrophils\n329000 /cmm Platelets\n860 /cmm WBC"
        );
    }

    #[test]
    fn error_messages() {
        let err = ExtractionError::Provider {
            status: 200,
            message: "File failed validation".into(),
        };
        assert_eq!(
            err.to_string(),
            "OCR provider returned error (status 200): File failed validation"
        );
        assert_eq!(
            ExtractionError::Configuration("OCR_API_KEY environment variable not set".into())
                .to_string(),
            "OCR_API_KEY environment variable not set"
        );
    }
}
