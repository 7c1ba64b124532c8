use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parlor_db::query::MalformedSearchQuery;
use thiserror::Error;
use tracing::{error, warn};

/// Handler failures. The store raises malformed search input as
/// `MalformedSearchQuery`; that maps to 400. Everything else it surfaces
/// passes through unchanged and maps to 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
    #[error("blocking task failed")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(err) = &self {
            if let Some(malformed) = err.downcast_ref::<MalformedSearchQuery>() {
                warn!("rejected request: {malformed}");
                return (StatusCode::BAD_REQUEST, malformed.to_string()).into_response();
            }
        }

        error!("request failed: {self:?}");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_db::Database;
    use parlor_db::queries::ListMessages;

    #[test]
    fn malformed_search_maps_to_bad_request() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .list_messages(&ListMessages {
                body: Some("\"".into()),
                ..Default::default()
            })
            .unwrap_err();

        let response = ApiError::Storage(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_storage_failures_map_to_internal_error() {
        let response = ApiError::Storage(anyhow::anyhow!("disk unplugged")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
