use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use parlor_db::queries::ListUsers;
use parlor_types::api::{CreateUserRequest, CreatedResponse, ListUsersQuery, UserResponse};
use parlor_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let args = ListUsers {
        name: query.name,
        token_identifier: query.token_identifier,
        only_active: query.only_active,
        descending: query.descending,
    };

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users(&args)).await??;

    let users = rows
        .into_iter()
        .map(|row| UserResponse {
            id: row.id.into_uuid(),
            name: row.value.name,
            token_identifier: row.value.token_identifier,
            status: row.value.status,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let user = User::from(req);

    let db = state.clone();
    let id = tokio::task::spawn_blocking(move || db.db.create_user(&user)).await??;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.into_uuid() })))
}
