use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;

static POWERED_BY: Lazy<HeaderValue> = Lazy::new(|| {
    HeaderValue::try_from(format!("Tsubasa/{}", tsubasa_lib::VERSION))
        .unwrap_or_else(|_| HeaderValue::from_static("Tsubasa"))
});

/// Set identifying, caching and hardening headers on every response.
///
/// Values set by handlers are overwritten.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("x-powered-by", POWERED_BY.clone());
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=7776000"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );

    response
}
