/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::fetcher::{Consumed, Fetcher};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use mailrelay_delivery::Deliverer;

/// The notification endpoint of the cloud provider.
#[derive(Debug, Clone)]
pub struct LiveEndpoint {
    /// Path of the route, without the leading `/`.
    pub path: String,
    /// Expected `Authorization` header.
    pub key: String,
    ///
    pub fetcher: std::sync::Arc<Fetcher>,
}

/// Shared by every route.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Deliverer to the local mailboxes.
    pub inbound: std::sync::Arc<Deliverer>,
    /// Deliverer to the cloud provider.
    pub outbound: Option<std::sync::Arc<Deliverer>>,
    /// see [`LiveEndpoint`]
    pub live: Option<LiveEndpoint>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LiveNotification {
    key: String,
    recipients: Option<Vec<String>>,
}

/// An error answered as `{"msg": ...}`.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "msg": self.1 }))).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(error: E) -> Self {
        let error = error.into();
        tracing::error!(error = %format!("{error:#}"), "Request handler failed.");
        Self(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server error, check its log.".to_string(),
        )
    }
}

fn message(msg: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "msg": msg.into() }))
}

async fn send_raw(State(state): State<AppState>, body: String) -> Result<Response, ApiError> {
    let Some(outbound) = state.outbound else {
        return Err(ApiError(
            StatusCode::SERVICE_UNAVAILABLE,
            "Outbound delivery is not configured.".to_string(),
        ));
    };
    if body.trim().is_empty() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "Can't send an empty mail.".to_string(),
        ));
    }

    let result = outbound.deliver_raw(body).await?;
    Ok(Json(serde_json::json!({ "providerMessageId": result.provider_message_id })).into_response())
}

async fn receive_raw(State(state): State<AppState>, body: String) -> Result<Response, ApiError> {
    state.inbound.deliver_raw(body).await?;
    Ok(message("Done!").into_response())
}

async fn live_mail(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let Some(live) = state.live else {
        return Err(ApiError(StatusCode::NOT_FOUND, "Not found.".to_string()));
    };

    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .is_some_and(|value| value.as_bytes() == live.key.as_bytes());
    if !authorized {
        tracing::warn!("Live mail notification with a bad authorization.");
        return Err(ApiError(StatusCode::FORBIDDEN, "Bad auth!".to_string()));
    }

    let notification = serde_json::from_slice::<LiveNotification>(&body).map_err(|error| {
        ApiError(
            StatusCode::BAD_REQUEST,
            format!("Malformed notification: {error}"),
        )
    })?;

    match live
        .fetcher
        .consume(&notification.key, notification.recipients)
        .await?
    {
        Consumed::Delivered => Ok(message("Done!").into_response()),
        Consumed::NotFound => {
            Ok(message(format!("Live mail '{}' not found.", notification.key)).into_response())
        }
    }
}

async fn log_request(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let (method, uri) = (request.method().clone(), request.uri().path().to_owned());
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "HTTP request handled."
    );
    response
}

/// Routes of the relay:
///
/// * `POST /send/raw` sends the body through the outbound deliverer
/// * `POST /receive/raw` delivers the body to the local mailboxes
/// * `POST /<path>` consumes the live mail of a provider notification
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/send/raw", post(send_raw))
        .route("/receive/raw", post(receive_raw));

    if let Some(live) = &state.live {
        router = router.route(&format!("/{}", live.path), post(live_mail));
    }

    router
        .layer(axum::middleware::from_fn(log_request))
        .with_state(state)
}

/// Serve `router` on `socket` until an error occurs.
///
/// # Errors
///
/// * failed to convert the socket to a [`tokio::net::TcpListener`]
/// * the server failed
#[tracing::instrument(name = "serve-http", skip_all)]
pub async fn serve(socket: std::net::TcpListener, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::from_std(socket)?;
    tracing::info!(interface = %listener.local_addr()?, "Listening for HTTP requests.");

    axum::serve(listener, router).await?;
    Ok(())
}
