// Request body extraction with the API's error shape

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` whose rejections render as `VALIDATION_ERROR`
///
/// Bodies that fail to parse, name an unknown enum variant or carry an
/// out-of-range value answer 400 with the usual JSON error body instead
/// of axum's plain-text 415/422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("body", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    enum Mood {
        Happy,
    }

    #[derive(Debug, Deserialize)]
    struct Greeting {
        mood: Mood,
    }

    fn request(body: &str, content_type: Option<&str>) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_accepts_a_valid_body() {
        let ApiJson(parsed) =
            ApiJson::<Greeting>::from_request(request(r#"{"mood":"happy"}"#, Some("application/json")), &())
                .await
                .unwrap();
        assert!(matches!(parsed.mood, Mood::Happy));
    }

    #[tokio::test]
    async fn test_unknown_variant_is_a_validation_error() {
        let error = ApiJson::<Greeting>::from_request(
            request(r#"{"mood":"grumpy"}"#, Some("application/json")),
            &(),
        )
        .await
        .err()
        .unwrap();

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        match error {
            ApiError::Validation { field, message } => {
                assert_eq!(field, "body");
                assert!(message.contains("grumpy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_is_a_validation_error() {
        let error = ApiJson::<Greeting>::from_request(request(r#"{"mood":"happy"}"#, None), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(error, ApiError::Validation { .. }));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }
}
