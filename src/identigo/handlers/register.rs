use crate::identigo::registrar::{RegisterError, Registrar};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, instrument};

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

// axum handler for registration
#[instrument(skip(registrar, payload))]
pub async fn register(
    registrar: Extension<Registrar>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Missing payload"})),
        );
    };

    match registrar.register(&request.email, &request.password).await {
        Ok(registered) => (
            StatusCode::CREATED,
            Json(json!({
                "userId": registered.user_id.to_string(),
                "email": registered.email,
            })),
        ),
        Err(RegisterError::Validation(errors)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid payload", "errors": errors})),
        ),
        Err(RegisterError::DuplicateEmail) => (
            StatusCode::CONFLICT,
            Json(json!({"message": "User with this email already exists"})),
        ),
        Err(err) => {
            error!("registration failed: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "Registration failed"})),
            )
        }
    }
}
