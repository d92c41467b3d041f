//! Telegram integration routes

use crate::auth::Claims;
use crate::error::ApiResult;
use crate::models::SuccessResponse;
use crate::telegram::payload::BotAction;
use crate::telegram::Payload;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadResponse {
    pub actions: Vec<BotAction>,
}

/// POST /api/integrations/telegram/payload/validate
///
/// Returns the normalized action list, or every issue found.
pub async fn validate_payload(
    Extension(claims): Extension<Claims>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<SuccessResponse<PayloadResponse>>> {
    let payload = Payload::parse(body)?;
    debug!(
        "{} validated a payload of {} actions",
        claims.email,
        payload.actions().len()
    );

    Ok(Json(SuccessResponse::with_data(
        "Payload is valid",
        PayloadResponse {
            actions: payload.actions().to_vec(),
        },
    )))
}
