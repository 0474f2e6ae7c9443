use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::utils::error::{AppError, FieldErrors, NON_FIELD_ERRORS};

const INVALID_BODY: &str = "Incorrect data. Please check all the data fields and try again.";

/// JSON body extractor that runs `validator` rules before the handler sees the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value
            .validate()
            .map_err(|errors| AppError::validation(INVALID_BODY, field_errors(&errors)))?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    AppError::invalid_field(INVALID_BODY, "body", rejection.body_text())
}

/// Flattens `validator` output into field -> messages, falling back to the rule code.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, failures) in errors.field_errors() {
        let field = match &*field {
            "__all__" => NON_FIELD_ERRORS.to_string(),
            name => name.to_string(),
        };
        let messages = failures.iter().map(|failure| {
            failure
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| format!("Invalid value ({}).", failure.code))
        });
        out.entry(field).or_default().extend(messages);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Probe {
        #[validate(required(message = "This field is required."))]
        name: Option<String>,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_field_errors_use_messages_or_codes() {
        let probe = Probe {
            name: None,
            email: "not-an-email".to_string(),
        };
        let errors = field_errors(&probe.validate().unwrap_err());
        assert_eq!(errors["name"], vec!["This field is required."]);
        assert_eq!(errors["email"], vec!["Invalid value (email)."]);
    }
}
