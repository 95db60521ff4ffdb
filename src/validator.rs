use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use courseboard_core::AppError;

/// Extracts a field name from serde's "missing field `x`" message.
fn missing_field(message: &str) -> Option<&str> {
    message
        .split("missing field `")
        .nth(1)
        .and_then(|s| s.split('`').next())
}

/// JSON body extractor that also runs `validator` rules.
///
/// Every failure is a 400: missing fields and rule violations are keyed by
/// field name, anything else is reported under `non_field_errors`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let error_msg = rejection.body_text();

                if let Some(field) = missing_field(&error_msg) {
                    return AppError::field(field, "This field is required.");
                }

                if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
                    return AppError::non_field(
                        "Missing 'Content-Type: application/json' header",
                    );
                }

                if matches!(rejection, JsonRejection::JsonDataError(_)) {
                    return AppError::non_field(format!("Invalid request body: {}", error_msg));
                }

                AppError::non_field("Invalid request body")
            })?;

        value.validate().map_err(AppError::validation)?;

        Ok(ValidatedJson(value))
    }
}
