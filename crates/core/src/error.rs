#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("resource with id {0} not found in the catalog")]
    ResourceNotFound(String),
    #[error("failed to read catalog file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to deserialize catalog: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to write output: {0}")]
    Output(std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] gridcheck_storage::StorageError),
    #[error("invalid identifier: {0}")]
    Types(#[from] gridcheck_types::TypesError),
}

pub type CheckResult<T> = std::result::Result<T, CheckError>;
