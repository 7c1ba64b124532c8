use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use parlor_db::queries::ListMessages;
use parlor_types::api::{
    CreateMessageRequest, CreatedResponse, ListMessagesQuery, MessageResponse,
};
use parlor_types::models::Message;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let args = ListMessages {
        author: query.author,
        conversation: query.conversation,
        body: query.body,
        exclude_hidden: query.exclude_hidden,
        newest_first: query.newest_first,
    };

    // Run the blocking DB query off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages(&args)).await??;

    let messages = rows
        .into_iter()
        .map(|row| MessageResponse {
            id: row.id.into_uuid(),
            author: row.value.author,
            conversation: row.value.conversation,
            body: row.value.body,
            hidden: row.value.hidden,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(messages))
}

pub async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let message = Message::from(req);

    let db = state.clone();
    let id = tokio::task::spawn_blocking(move || db.db.create_message(&message)).await??;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.into_uuid() })))
}
