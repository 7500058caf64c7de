use axum::{
    extract::{path::ErrorKind, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

pub const NOT_FOUND_DETAIL: &str = "Produto não encontrado";

/// One entry of a 422 `detail` array: where the input was wrong and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Location path, e.g. `["body", "quantidade"]` or `["path", "id"]`.
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl FieldError {
    pub fn new(kind: &'static str, loc: Vec<Value>, msg: impl Into<String>) -> Self {
        Self {
            kind,
            loc,
            msg: msg.into(),
            ctx: None,
        }
    }

    pub fn with_ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }
}

/// Failures a handler can surface. Every variant renders as
/// `{"detail": ...}` with the matching status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Body or path parameter did not have the expected shape.
    #[error("Invalid request: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Product {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation(vec![err])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        let field = match &rejection {
            PathRejection::FailedToDeserializePathParams(err) => match err.kind() {
                ErrorKind::ParseErrorAtKey {
                    key,
                    value,
                    expected_type,
                } => FieldError::new(
                    "parsing",
                    vec![json!("path"), json!(key)],
                    format!("Input should be a valid {expected_type}"),
                )
                .with_ctx(json!({ "input": value })),
                _ => FieldError::new("parsing", vec![json!("path")], err.body_text()),
            },
            _ => FieldError::new("parsing", vec![json!("path")], rejection.body_text()),
        };
        field.into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors)),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, json!(NOT_FOUND_DETAIL)),
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal Server Error"),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_uses_fixed_detail() {
        let (status, body) = render(AppError::NotFound(999)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Produto não encontrado" }));
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let err = FieldError::new(
            "missing",
            vec![json!("body"), json!("nome")],
            "Field required",
        );
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "detail": [
                    { "type": "missing", "loc": ["body", "nome"], "msg": "Field required" }
                ]
            })
        );
    }

    #[tokio::test]
    async fn validation_context_is_rendered_when_present() {
        let err = FieldError::new("parsing", vec![json!("path"), json!("id")], "bad")
            .with_ctx(json!({ "input": "abc" }));
        let (_, body) = render(err.into()).await;
        assert_eq!(body["detail"][0]["ctx"]["input"], "abc");
    }

    #[tokio::test]
    async fn database_error_is_sanitized() {
        let (status, body) = render(AppError::Database(sqlx::Error::PoolClosed)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal Server Error");
    }
}
