use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
