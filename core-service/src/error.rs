use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
