//! Request interception.
//!
//! Applied with `Router::layer` after all route modules are merged, so the
//! matched route pattern is available when a request passes through.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::tracking::tracker::{CompletionHandle, MetricsTracker};

/// Track one request from interception to completion.
///
/// A [`CompletionHandle`] is placed in the request extensions before the
/// handler runs and completed with the response status afterwards. Handlers
/// that already completed it are not recorded twice.
///
/// If the request future is dropped before a response exists (an outer
/// timeout fired or the client went away) the request is still recorded,
/// with `408 Request Timeout`.
pub async fn track(
    State(tracker): State<Arc<MetricsTracker>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !tracker.is_enabled() {
        return next.run(request).await;
    }

    let pending = Pending(tracker.begin(&request));
    request.extensions_mut().insert(pending.0.clone());

    let response = next.run(request).await;
    pending.finish(response.status());
    response
}

/// Completes its handle on drop unless [`Pending::finish`] ran first.
struct Pending(CompletionHandle);

impl Pending {
    fn finish(self, status: StatusCode) {
        self.0.complete(status);
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if self.0.complete(StatusCode::REQUEST_TIMEOUT) {
            tracing::warn!(
                request_id = self.0.request_id(),
                route = %self.0.route_key(),
                "Request abandoned before a response was produced"
            );
        }
    }
}
