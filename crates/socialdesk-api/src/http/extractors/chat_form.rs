//! Chat turn form body.
//!
//! Accepts `application/x-www-form-urlencoded` and `multipart/form-data`
//! with a required `prompt` field and an optional `attachments` field
//! holding a JSON list.

use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::http::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub prompt: String,
    #[serde(default)]
    pub attachments: Option<String>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn from_multipart(mut multipart: Multipart) -> Result<ChatForm, AppError> {
    let mut prompt = None;
    let mut attachments = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" | "attachments" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                if name == "prompt" {
                    prompt = Some(text);
                } else {
                    attachments = Some(text);
                }
            }
            _ => {}
        }
    }

    let prompt =
        prompt.ok_or_else(|| AppError::Validation("missing form field 'prompt'".to_string()))?;
    Ok(ChatForm {
        prompt,
        attachments,
    })
}

impl<S: Send + Sync> FromRequest<S> for ChatForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return from_multipart(multipart).await;
        }

        let Form(form) = Form::<ChatForm>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(form)
    }
}
