pub mod extraction; // OCR client + lab value normalization
pub mod summary; // Patient/doctor summaries via the LLM provider
pub mod analysis; // Orchestrator: text → normalize → summarize → persist
