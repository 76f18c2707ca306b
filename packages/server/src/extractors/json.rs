use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body whose rejections come back as `ErrorBody` responses.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(rejection_error)
    }
}

/// Map a JSON rejection onto the service's error codes.
fn rejection_error(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation("Request body is too large".into());
    }
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected a JSON body with Content-Type: application/json".to_string()
        }
        JsonRejection::JsonSyntaxError(e) => format!("Request body is not valid JSON: {e}"),
        JsonRejection::JsonDataError(e) => format!("Invalid request fields: {e}"),
        other => format!("Could not read request body: {}", other.body_text()),
    };
    AppError::Validation(message)
}
