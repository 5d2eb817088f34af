use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tokio_util::sync::CancellationToken;

/// Token cancelled when the client goes away before the response is ready.
#[derive(Clone, Debug, Default)]
pub struct RequestCancellation(pub CancellationToken);

/// Attaches a `RequestCancellation` to every request. Dropping the request
/// future (client disconnect) drops the guard, which cancels the token.
pub async fn cancel_on_disconnect(mut request: Request, next: Next) -> Response {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    request.extensions_mut().insert(RequestCancellation(token));

    let response = next.run(request).await;
    guard.disarm();
    response
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCancellation>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    #[tokio::test]
    async fn completed_request_keeps_token_alive() {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let app = Router::new()
            .route(
                "/",
                get(move |RequestCancellation(token): RequestCancellation| {
                    if let Some(tx) = tx.lock().unwrap().take() {
                        let _ = tx.send(token);
                    }
                    async { StatusCode::OK }
                }),
            )
            .layer(middleware::from_fn(cancel_on_disconnect));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!rx.await.unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn dropped_request_cancels_token() {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let app = Router::new()
            .route(
                "/",
                get(move |RequestCancellation(token): RequestCancellation| {
                    if let Some(tx) = tx.lock().unwrap().take() {
                        let _ = tx.send(token);
                    }
                    async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        StatusCode::OK
                    }
                }),
            )
            .layer(middleware::from_fn(cancel_on_disconnect));

        let pending = tokio::spawn(app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()));
        let token = rx.await.unwrap();
        assert!(!token.is_cancelled());

        pending.abort();
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("token cancelled after the request was dropped");
    }

    #[tokio::test]
    async fn missing_middleware_yields_fresh_token() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let RequestCancellation(token) = RequestCancellation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(!token.is_cancelled());
    }
}
