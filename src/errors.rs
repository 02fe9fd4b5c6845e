use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlKvError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("statement preparation failed: {0}")]
    StatementPreparation(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SqlKvError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        SqlKvError::Connection(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        SqlKvError::Schema(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        SqlKvError::Config(msg.into())
    }

    pub fn preparation<T: Into<String>>(msg: T) -> Self {
        SqlKvError::StatementPreparation(msg.into())
    }

    pub fn execution<T: Into<String>>(msg: T) -> Self {
        SqlKvError::Execution(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SqlKvError::NotFound(msg.into())
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        SqlKvError::InvalidArgument(msg.into())
    }
}
