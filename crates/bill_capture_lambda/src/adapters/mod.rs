use thiserror::Error;

pub mod categorizer;
pub mod object_store;
pub mod ocr;
pub mod queue;
pub mod repository;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("queue error: {0}")]
    Queue(String),
    #[error("OCR error: {0}")]
    Ocr(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("categorizer error: {0}")]
    Categorizer(String),
}
