use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Marks a response that should carry the rendered not-found page.
#[derive(Debug, Clone, Copy)]
pub struct NotFoundPage;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(StoreError),

    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound,
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                let mut res = StatusCode::NOT_FOUND.into_response();
                res.extensions_mut().insert(NotFoundPage);
                res
            }
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_becomes_not_found() {
        let err: AppError = StoreError::NotFound { entity: "user", id: 7 }.into();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn not_found_response_is_marked_for_rendering() {
        let res = AppError::NotFound.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.extensions().get::<NotFoundPage>().is_some());
    }

    #[test]
    fn duplicate_tag_is_an_internal_error() {
        let err: AppError = StoreError::DuplicateTagName("rust".into()).into();
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.extensions().get::<NotFoundPage>().is_none());
    }
}
