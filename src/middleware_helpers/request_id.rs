//! `x-request-id` propagation.
//!
//! A well-formed client id is kept, anything else is replaced by a fresh UUID.
//! The id is put into request extensions, scoped as the task-local read by
//! `ApiResponse` metadata and `ErrorResponse`, and echoed on the response.

use crate::tracing::{scope_request_id, RequestId};
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn resolve(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_header)
        .unwrap_or_default()
}

fn stamp(headers: &mut HeaderMap, value: Option<&HeaderValue>) {
    let name = HeaderName::from_static(REQUEST_ID_HEADER);
    match value {
        Some(value) => {
            headers.insert(name, value.clone());
        }
        None => {
            headers.remove(name);
        }
    }
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = resolve(request.headers());
    let value = HeaderValue::from_str(request_id.as_str()).ok();

    // a rejected client value must not reach the trace span
    stamp(request.headers_mut(), value.as_ref());
    request.extensions_mut().insert(request_id.clone());

    let mut response = scope_request_id(request_id, next.run(request)).await;
    stamp(response.headers_mut(), value.as_ref());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorResponse, ServiceError};
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn echo(Extension(request_id): Extension<RequestId>) -> String {
        request_id.as_str().to_string()
    }

    async fn missing_booking() -> Result<(), ServiceError> {
        Err(ServiceError::NotFound("Booking not found".to_string()))
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", get(echo))
            .route("/missing", get(missing_booking))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    fn get_with(uri: &str, request_id: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn error_body_carries_the_minted_id() {
        let response = app().oneshot(get_with("/missing", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let header = response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some(header.as_str()));
        assert!(uuid::Uuid::parse_str(&header).is_ok());
    }

    #[tokio::test]
    async fn client_id_reaches_handlers_and_response() {
        let response = app()
            .oneshot(get_with("/echo", Some("booking-flow-77")))
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "booking-flow-77");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"booking-flow-77");
    }

    #[tokio::test]
    async fn malformed_client_id_is_replaced() {
        let response = app()
            .oneshot(get_with("/echo", Some("semi;colon")))
            .await
            .unwrap();
        let header = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert_ne!(header, "semi;colon");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], header.as_bytes());
    }
}
