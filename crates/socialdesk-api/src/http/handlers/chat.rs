//! Chat endpoints.
//!
//! - `POST /chat/new-conversation` mints an id without persisting anything
//! - `GET  /chat/conversations` lists the caller's conversations
//! - `GET  /chat/{id}` returns stored history, one JSON line per message
//! - `POST /chat/{id}` runs a turn and streams JSON lines as they happen
//! - `POST /chat/migrate-conversations` moves anonymous history to the
//!   signed-in user

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

use socialdesk_types::attachment::parse_attachments;
use socialdesk_types::conversation::{ConversationSummary, new_conversation_id};
use socialdesk_types::error::ChatError;
use socialdesk_types::message::{ChatLine, to_chat_lines};

use crate::http::cookies::{ANONYMOUS_COOKIE, SetCookies, cookie_value};
use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::http::extractors::caller::Caller;
use crate::http::extractors::chat_form::ChatForm;
use crate::state::AppState;

const LINES_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Serialize)]
pub struct NewConversationResponse {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

fn encode_line(line: &ChatLine) -> Result<Bytes, std::io::Error> {
    let mut bytes = serde_json::to_vec(line).map_err(std::io::Error::other)?;
    bytes.push(b'\n');
    Ok(Bytes::from(bytes))
}

/// POST /chat/new-conversation
pub async fn new_conversation() -> Json<NewConversationResponse> {
    Json(NewConversationResponse {
        conversation_id: new_conversation_id(),
    })
}

/// GET /chat/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<(SetCookies, Json<ConversationsResponse>), AppError> {
    let conversations = state
        .conversations
        .list_for_user(&caller.identity.user_id, params.limit)
        .await?;
    Ok((caller.cookies, Json(ConversationsResponse { conversations })))
}

/// GET /chat/{id}
///
/// Absence and foreign ownership both answer 404.
pub async fn get_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(conversation_id): Path<String>,
) -> Result<Response, AppError> {
    if !state
        .conversations
        .user_owns(&conversation_id, &caller.identity.user_id)
        .await?
    {
        return Err(ChatError::NotFound.into());
    }

    let history = state.conversations.get_history(&conversation_id).await?;
    let lines = to_chat_lines(&history)
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        caller.cookies,
        [(CONTENT_TYPE, LINES_CONTENT_TYPE)],
        lines.join("\n"),
    )
        .into_response())
}

/// POST /chat/{id}
///
/// Ownership and input are checked before the first byte; afterwards a
/// failure ends the body early instead of producing an error status.
pub async fn post_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(conversation_id): Path<String>,
    form: ChatForm,
) -> Result<Response, AppError> {
    let parsed = parse_attachments(form.attachments.as_deref().unwrap_or_default());
    if !parsed.rejected.is_empty() {
        tracing::warn!(
            conversation_id = %conversation_id,
            rejected = ?parsed.rejected,
            "dropping unsupported attachments"
        );
    }

    let business = if caller.identity.is_anonymous {
        None
    } else {
        state.business.get(&caller.identity.user_id).await?
    };

    let turn = state
        .chat
        .prepare(
            &conversation_id,
            &caller.identity.user_id,
            form.prompt,
            parsed.accepted,
            business,
        )
        .await?;

    let rx = state.chat.spawn(turn);
    let body = ReceiverStream::new(rx).map(|item| match item {
        Ok(line) => encode_line(&line),
        Err(e) => Err(std::io::Error::other(e)),
    });

    Ok((
        caller.cookies,
        [(CONTENT_TYPE, LINES_CONTENT_TYPE)],
        Body::from_stream(body),
    )
        .into_response())
}

/// POST /chat/migrate-conversations
pub async fn migrate_conversations(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<(SetCookies, Json<serde_json::Value>), AppError> {
    let mut cookies = SetCookies::new(state.config.session.secure_cookies);

    let Some(anonymous_user_id) = cookie_value(&headers, ANONYMOUS_COOKIE) else {
        return Ok((
            cookies,
            Json(serde_json::json!({
                "migrated_conversations": 0,
                "user_id": auth.user.id,
                "message": "No anonymous conversations to migrate",
            })),
        ));
    };

    let moved = state
        .identity
        .migrate(&auth.identity(), &anonymous_user_id)
        .await?;
    cookies.clear(ANONYMOUS_COOKIE);

    Ok((
        cookies,
        Json(serde_json::json!({
            "migrated_conversations": moved,
            "user_id": auth.user.id,
            "anonymous_user_id": anonymous_user_id,
        })),
    ))
}
