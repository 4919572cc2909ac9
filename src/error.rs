use warp::http::status::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub code: StatusCode,
    pub msg: String,
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Error {
        Error {
            code: StatusCode::BAD_REQUEST,
            msg: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Error {
        Error {
            code: StatusCode::NOT_FOUND,
            msg: msg.into(),
        }
    }

    /// Deletion code did not match the stored one.
    pub fn forbidden(msg: impl Into<String>) -> Error {
        Error {
            code: StatusCode::FORBIDDEN,
            msg: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Error {
        Error {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            msg: msg.into(),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let canon = self.code.canonical_reason().unwrap_or("");
        write!(f, "Error {} {}, {}", self.code.as_str(), canon, self.msg)
    }
}

impl std::error::Error for Error {}

impl From<refinery::Error> for Error {
    fn from(err: refinery::Error) -> Error {
        let msg = format!("Database 'refinery' migration error, {}", err);
        Error::internal(msg)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        let msg = format!("Database rusqlite error {}", err);
        Error::internal(msg)
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Error {
        let msg = format!("Failed to obtain a database connection from the pool, {}", err);
        Error::internal(msg)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        let msg = format!("Filesystem error, {}", err);
        Error::internal(msg)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        let msg = format!("JSON formatting error {}", err);
        Error {
            code: StatusCode::BAD_REQUEST,
            msg,
        }
    }
}

impl From<warp::Error> for Error {
    fn from(err: warp::Error) -> Error {
        let msg = format!("Failed to read request body, {}", err);
        Error {
            code: StatusCode::BAD_REQUEST,
            msg,
        }
    }
}

pub trait ErrorContext<T> {
    fn context<F>(self, context_add: F) -> Result<T>
    where
        F: FnOnce() -> String;
    fn context_str(self, context_add: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context<F>(self, context_add: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        match self {
            Ok(t) => Ok(t),
            Err(err) => {
                let err: Error = err.into();
                let code = err.code;
                let mut msg = err.msg;
                msg.push_str(", ");
                msg.push_str(&context_add());
                Err(Error { code, msg })
            }
        }
    }
    fn context_str(self, context_add: &str) -> Result<T> {
        match self {
            Ok(t) => Ok(t),
            Err(err) => {
                let err: Error = err.into();
                let code = err.code;
                let mut msg = err.msg;
                msg.push_str(", ");
                msg.push_str(context_add);
                Err(Error { code, msg })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_status_code() {
        let failing: std::result::Result<(), Error> = Err(Error::not_found("Item 7 not found"));
        let err = failing.context_str("while rendering detail view").unwrap_err();
        assert_eq!(err.code, StatusCode::NOT_FOUND);
        assert_eq!(err.msg, "Item 7 not found, while rendering detail view");
    }

    #[test]
    fn test_display() {
        let err = Error::forbidden("Wrong deletion code");
        assert_eq!(err.to_string(), "Error 403 Forbidden, Wrong deletion code");
    }
}
