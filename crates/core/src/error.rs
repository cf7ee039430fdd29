use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Image reference must not be empty")]
    EmptyImageRef,

    #[error("Probability score out of range: {0}")]
    ScoreOutOfRange(i64),

    #[error("Validation error: {0}")]
    Validation(String),
}
