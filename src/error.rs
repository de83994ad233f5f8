#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Invalid request input. The message is shown to the client verbatim.
    #[error("{0}")]
    Validation(String),

    /// The target site could not be fetched. The detail stays server-side;
    /// clients get a generic message.
    #[error("failed to fetch page: {0}")]
    Fetch(String),

    #[error("preview not found")]
    NotFound,

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
