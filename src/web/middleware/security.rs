//! Security headers middleware.
//!
//! Uploaded files are served with whatever content type the client declared,
//! so download responses are additionally sandboxed.

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderValue},
        Request,
    },
    middleware::Next,
    response::Response,
};

/// Policy applied to responses that carry an uploaded file.
const DOWNLOAD_CSP: &str = "sandbox; default-src 'none'";

/// Whether the response serves a stored file rather than an API body.
fn is_attachment(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("attachment"))
}

/// Security headers middleware.
///
/// Every response gets `X-Content-Type-Options: nosniff`,
/// `X-Frame-Options: DENY`, `Referrer-Policy: no-referrer` and
/// `Cache-Control: no-store`. Attachments also get a sandboxing
/// `Content-Security-Policy`, so an uploaded HTML or SVG file opened in the
/// browser cannot run script against this origin.
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    // Listings and files change on every upload or delete
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if is_attachment(headers) {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(DOWNLOAD_CSP),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    async fn json_handler() -> &'static str {
        "[]"
    }

    async fn file_handler() -> ([(header::HeaderName, &'static str); 2], &'static str) {
        (
            [
                (header::CONTENT_TYPE, "text/html"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"x.html\""),
            ],
            "<script>alert(1)</script>",
        )
    }

    async fn get_response(app: Router, uri: &str) -> Response {
        app.layer(middleware::from_fn(security_headers))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let app = Router::new().route("/files", get(json_handler));
        let response = get_response(app, "/files").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(headers.get("Referrer-Policy").unwrap(), "no-referrer");
        assert_eq!(headers.get("Cache-Control").unwrap(), "no-store");
        assert!(headers.get("Content-Security-Policy").is_none());
    }

    #[tokio::test]
    async fn test_attachment_is_sandboxed() {
        let app = Router::new().route("/download/x", get(file_handler));
        let response = get_response(app, "/download/x").await;

        let headers = response.headers();
        assert_eq!(headers.get("Content-Security-Policy").unwrap(), DOWNLOAD_CSP);
        assert_eq!(headers.get("Content-Type").unwrap(), "text/html");
    }

    #[test]
    fn test_is_attachment() {
        let mut headers = HeaderMap::new();
        assert!(!is_attachment(&headers));

        headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
        assert!(!is_attachment(&headers));

        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"a.txt\""),
        );
        assert!(is_attachment(&headers));
    }
}
