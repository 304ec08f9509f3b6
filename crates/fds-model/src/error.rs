use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid label selector: {0}")]
    InvalidSelector(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
