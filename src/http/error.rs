use rouille::Response;

use crate::{auth::AuthError, media::error::MediaError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Forbidden(String),
    Unauthorized(String),
    Internal(String),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::LibraryNotFound(_)
            | MediaError::ItemNotFound(_)
            | MediaError::DirectoryNotFound(_) => ApiError::NotFound(err.to_string()),

            MediaError::InvalidName(_) => ApiError::BadRequest(err.to_string()),

            MediaError::DuplicateName(_) | MediaError::ScanInProgress(_) => {
                ApiError::Conflict(err.to_string())
            }

            MediaError::DirectoryUnreadable(_) => ApiError::Forbidden(err.to_string()),

            MediaError::NoExistingAncestor(_) | MediaError::Io(_) | MediaError::Storage(_) => {
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmptyCredentials => ApiError::BadRequest(err.to_string()),

            AuthError::UsernameTaken(_) => ApiError::Conflict(err.to_string()),

            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                ApiError::Unauthorized(err.to_string())
            }

            AuthError::Hash(_) | AuthError::Token(_) | AuthError::Storage(_) => {
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl ApiError {
    pub fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) =>
                Response::text(msg).with_status_code(404),

            ApiError::BadRequest(msg) =>
                Response::text(msg).with_status_code(400),

            ApiError::Conflict(msg) =>
                Response::text(msg).with_status_code(409),

            ApiError::Forbidden(msg) =>
                Response::text(msg).with_status_code(403),

            ApiError::Unauthorized(msg) =>
                Response::text(msg).with_status_code(401),

            ApiError::Internal(msg) =>
                Response::text(msg).with_status_code(500),
        }
    }
}
