use axum::{
    body::Body,
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};

/// Method the client actually sent, recorded when routing used another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalMethod(pub Method);

/// Route `HEAD` requests as `GET` and drop the response body.
///
/// Headers of the `GET` response (including `Content-Length`) are kept.
pub async fn head_as_get(mut req: Request, next: Next) -> Response {
    if req.method() != Method::HEAD {
        return next.run(req).await;
    }

    *req.method_mut() = Method::GET;
    req.extensions_mut().insert(OriginalMethod(Method::HEAD));

    let (parts, _) = next.run(req).await.into_parts();
    Response::from_parts(parts, Body::empty())
}
