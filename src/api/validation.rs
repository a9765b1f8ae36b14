//! Request body extractors with JSON validation.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, FieldError};

/// Body used when a request carries none.
const EMPTY_BODY: &[u8] = b"{}";

/// Deserialized JSON body; rejects with a 400 listing what is wrong.
///
/// Types with `#[serde(deny_unknown_fields)]` reject unexpected fields.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

/// The request body as sent, checked to be well-formed JSON.
#[derive(Debug, Clone)]
pub struct RawJson(pub Bytes);

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Read the body, enforcing the body limit and JSON content type.
async fn read_body<S>(req: Request, state: &S) -> Result<Bytes, ApiError>
where
    S: Send + Sync,
{
    let json_content = is_json_content_type(req.headers());

    let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            // Truncated or aborted uploads are the caller's fault
            ApiError::Validation(vec![FieldError {
                field: "body".to_string(),
                message: rejection.body_text(),
            }])
        }
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Bytes::from_static(EMPTY_BODY));
    }

    if !json_content {
        return Err(ApiError::UnsupportedMediaType);
    }

    Ok(bytes)
}

fn to_field_error(err: serde_json::Error) -> FieldError {
    FieldError {
        field: format!("line {}, column {}", err.line(), err.column()),
        message: err.to_string(),
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_body(req, state).await?;
        serde_json::from_slice(&bytes)
            .map(ValidatedJson)
            .map_err(|e| ApiError::Validation(vec![to_field_error(e)]))
    }
}

#[async_trait]
impl<S> FromRequest<S> for RawJson
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_body(req, state).await?;
        serde_json::from_slice::<serde::de::IgnoredAny>(&bytes)
            .map_err(|e| ApiError::Validation(vec![to_field_error(e)]))?;
        Ok(RawJson(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use axum::body::Body;
    use futures::stream;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Greeting {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn recognizes_json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "Application/JSON".parse().unwrap());
        assert!(is_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "application/vnd.api+json".parse().unwrap());
        assert!(is_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json_content_type(&headers));
    }

    #[tokio::test]
    async fn parses_any_json_value() {
        let ValidatedJson(value) =
            ValidatedJson::<Value>::from_request(json_request("[1, \"two\", null]"), &())
                .await
                .unwrap();
        assert_eq!(value, json!([1, "two", null]));

        let ValidatedJson(value) =
            ValidatedJson::<Value>::from_request(json_request("42"), &())
                .await
                .unwrap();
        assert_eq!(value, json!(42));
    }

    #[tokio::test]
    async fn empty_body_becomes_empty_object() {
        let request = Request::builder().method("POST").body(Body::empty()).unwrap();
        let ValidatedJson(value) = ValidatedJson::<Value>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn rejects_unknown_fields() {
        let err = ValidatedJson::<Greeting>::from_request(
            json_request(r#"{"name": "polly", "cracker": true}"#),
            &(),
        )
        .await
        .unwrap_err();

        match err {
            ApiError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert!(fields[0].message.contains("unknown field `cracker`"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reports_syntax_error_location() {
        let err = ValidatedJson::<Value>::from_request(json_request("{\"a\": }"), &())
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(fields) => assert_eq!(fields[0].field, "line 1, column 7"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejects_non_json_content_type() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("{}"))
            .unwrap();
        let err = RawJson::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedMediaType));
    }

    #[tokio::test]
    async fn aborted_upload_is_a_client_error() {
        let chunks: Vec<Result<&'static str, io::Error>> = vec![
            Ok("{\"a\":"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        let err = ValidatedJson::<Value>::from_request(request, &())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::Validation(fields) => assert_eq!(fields[0].field, "body"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn raw_json_keeps_original_bytes() {
        let body = "{ \"b\": 2,\n  \"a\": 1 }";
        let RawJson(bytes) = RawJson::from_request(json_request(body), &()).await.unwrap();
        assert_eq!(&bytes[..], body.as_bytes());
    }
}
