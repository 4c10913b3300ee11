use std::fmt;

/// Why an admin credential or session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Username, password or session token not supplied.
    MissingCredentials,
    /// Unknown user or wrong password.
    InvalidCredentials,
    /// Token not issued by this desk or already logged out.
    InvalidSession,
    /// Token was valid but its lifetime ran out.
    SessionExpired,
}

/// Error returned by every studio desk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// A required field was empty or absent.
    MissingField(&'static str),
    /// A field was present but malformed.
    BadInput(String),
    /// No record with this id.
    NotFound {
        /// Record kind, e.g. `"reservation"`.
        kind: &'static str,
        /// Requested id.
        id: u64,
    },
    /// The caller may not perform this action on the record.
    Forbidden(&'static str),
    /// The request collides with an existing record.
    Conflict(String),
    /// Admin authentication failed.
    Auth(AuthFailure),
}

impl From<AuthFailure> for StudioError {
    fn from(failure: AuthFailure) -> Self {
        StudioError::Auth(failure)
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::MissingCredentials => write!(f, "missing credentials"),
            AuthFailure::InvalidCredentials => write!(f, "invalid credentials"),
            AuthFailure::InvalidSession => write!(f, "invalid session"),
            AuthFailure::SessionExpired => write!(f, "session expired"),
        }
    }
}

impl fmt::Display for StudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudioError::MissingField(field) => write!(f, "missing field: {field}"),
            StudioError::BadInput(msg) => write!(f, "bad input: {msg}"),
            StudioError::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            StudioError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            StudioError::Conflict(msg) => write!(f, "conflict: {msg}"),
            StudioError::Auth(failure) => write!(f, "authentication failed: {failure}"),
        }
    }
}

impl std::error::Error for StudioError {}

impl StudioError {
    /// Message safe to show to a site visitor. Never includes internal
    /// detail beyond the offending field.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::MissingField(field) => format!("Please fill in the {field} field."),
            StudioError::BadInput(msg) => format!("Please check your input: {msg}."),
            StudioError::NotFound { kind, .. } => format!("That {kind} could not be found."),
            StudioError::Forbidden(msg) => format!("Not allowed: {msg}."),
            StudioError::Conflict(msg) => format!("{msg}. Please choose another option."),
            StudioError::Auth(AuthFailure::MissingCredentials) => {
                "Please enter both your username and password.".to_owned()
            }
            StudioError::Auth(AuthFailure::InvalidCredentials) => {
                "Wrong username or password.".to_owned()
            }
            StudioError::Auth(AuthFailure::InvalidSession) => {
                "Your session is not valid. Please log in again.".to_owned()
            }
            StudioError::Auth(AuthFailure::SessionExpired) => {
                "Your session has expired. Please log in again.".to_owned()
            }
        }
    }

    /// HTTP status an HTTP front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            StudioError::MissingField(_) | StudioError::BadInput(_) => 400,
            StudioError::Auth(_) => 401,
            StudioError::Forbidden(_) => 403,
            StudioError::NotFound { .. } => 404,
            StudioError::Conflict(_) => 409,
        }
    }

    /// JSON error body, `{"error": <user message>}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.user_message() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_have_distinct_messages() {
        let all = [
            AuthFailure::MissingCredentials,
            AuthFailure::InvalidCredentials,
            AuthFailure::InvalidSession,
            AuthFailure::SessionExpired,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(
                    StudioError::from(*a).user_message(),
                    StudioError::from(*b).user_message()
                );
            }
        }
    }

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(StudioError::MissingField("name").status_code(), 400);
        assert_eq!(StudioError::BadInput("x".into()).status_code(), 400);
        assert_eq!(StudioError::Auth(AuthFailure::SessionExpired).status_code(), 401);
        assert_eq!(StudioError::Forbidden("x").status_code(), 403);
        assert_eq!(
            StudioError::NotFound {
                kind: "review",
                id: 7
            }
            .status_code(),
            404
        );
        assert_eq!(StudioError::Conflict("x".into()).status_code(), 409);
    }

    #[test]
    fn json_body_carries_user_message() {
        let err = StudioError::MissingField("phone");
        assert_eq!(err.to_json()["error"], err.user_message());
    }
}
