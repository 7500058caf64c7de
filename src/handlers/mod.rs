pub mod products;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{AppError, FieldError};

/// JSON body extractor. Rejections render as 422 with a `detail` array
/// locating the offending field. A request without `Content-Type` is still
/// read as JSON; a non-JSON `Content-Type` is rejected.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_or_unspecified(req.headers()) {
            return Err(FieldError::new(
                "model_attributes_type",
                vec![json!("body")],
                "Input should be a valid dictionary or object to extract fields from",
            )
            .into());
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            FieldError::new("body_unreadable", vec![json!("body")], rejection.body_text())
        })?;

        parse_body(&bytes).map(ValidJson)
    }
}

/// Path extractor with the same 422 rejection, used for `:id` segments.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);

fn is_json_or_unspecified(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };

    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.strip_prefix("application/") {
        Some(subtype) => subtype == "json" || subtype.ends_with("+json"),
        None => false,
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.is_empty() {
        return Err(FieldError::new("missing", vec![json!("body")], "Field required").into());
    }

    let value: Value = serde_json::from_slice(bytes).map_err(|err| {
        FieldError::new("json_invalid", vec![json!("body")], "JSON decode error")
            .with_ctx(json!({ "error": err.to_string() }))
    })?;

    serde_path_to_error::deserialize(value).map_err(|err| {
        let mut loc = vec![json!("body")];
        loc.extend(err.path().iter().filter_map(|segment| match segment {
            serde_path_to_error::Segment::Seq { index } => Some(json!(index)),
            serde_path_to_error::Segment::Map { key } => Some(json!(key)),
            serde_path_to_error::Segment::Enum { variant } => Some(json!(variant)),
            serde_path_to_error::Segment::Unknown => None,
        }));

        let message = err.inner().to_string();
        let field = match missing_field(&message).map(str::to_owned) {
            Some(name) => {
                loc.push(json!(name));
                FieldError::new("missing", loc, "Field required")
            }
            None if loc.len() == 1 => FieldError::new(
                "model_attributes_type",
                loc,
                "Input should be a valid dictionary or object to extract fields from",
            ),
            None => FieldError::new("value_error", loc, message),
        };
        field.into()
    })
}

/// Field name out of serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.split('`').next()
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "service": "stock-service" })))
}
