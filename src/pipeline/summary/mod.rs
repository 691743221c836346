pub mod types;
pub mod prompt;
pub mod parser;
pub mod cohere;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use cohere::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("{0}")]
    Configuration(String),

    #[error("Summary provider returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
