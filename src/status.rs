use serde::{Deserialize, Serialize};

use crate::errors::SqlKvError;

/// Outcome of one workload operation as seen by the workload driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Ok,
    NotFound,
    BadRequest,
    Error,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "NOT_FOUND",
            Status::BadRequest => "BAD_REQUEST",
            Status::Error => "ERROR",
        }
    }
}

impl From<&SqlKvError> for Status {
    fn from(err: &SqlKvError) -> Self {
        match err {
            SqlKvError::NotFound(_) => Status::NotFound,
            SqlKvError::InvalidArgument(_) => Status::BadRequest,
            _ => Status::Error,
        }
    }
}

impl<T> From<&Result<T, SqlKvError>> for Status {
    fn from(result: &Result<T, SqlKvError>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => Status::from(err),
        }
    }
}
