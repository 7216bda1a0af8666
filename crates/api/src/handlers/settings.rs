use crate::handlers::error::{api_error, ApiError};
use crate::middleware::RequestSettings;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde_json::Value;

/// Single value from the settings in effect for this request
pub async fn get_setting(
    Path(key): Path<String>,
    Extension(settings): Extension<RequestSettings>,
) -> Result<Json<Value>, ApiError> {
    settings
        .value(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "setting_not_found",
                &format!("No setting named '{}'", key),
            )
        })
}
