use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table '{table}' has no column '{column}' in the written batch")]
    SchemaMismatch { table: String, column: String },

    #[error("No '{mapping}' entry for player '{player_id}'")]
    MissingMapping { mapping: &'static str, player_id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GenResult<T> = Result<T, GenError>;
