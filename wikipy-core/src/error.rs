use thiserror::Error;
use wikipy_provider::ApiError;

#[derive(Error, Debug)]
pub enum WikipyError {
    #[error("Fetch failed: {0}")]
    Fetch(ApiError),

    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl WikipyError {
    /// Errors a traversal recovers from by skipping the article.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WikipyError::Fetch(_) | WikipyError::NotFound(_) | WikipyError::Storage(_)
        )
    }
}

impl From<ApiError> for WikipyError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(title) => WikipyError::NotFound(title),
            other => WikipyError::Fetch(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, WikipyError>;
