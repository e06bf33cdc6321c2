use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::state::AppState;
use crate::{auth, media, moves, users};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.client_origin.as_deref());
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(media::router())
                .merge(moves::router())
                .merge(users::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Credentialed CORS for the configured frontend; permissive without one.
fn cors_layer(client_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = client_origin else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]),
        Err(e) => {
            warn!(error = %e, origin, "invalid CLIENT_ORIGIN; using permissive CORS");
            CorsLayer::permissive()
        }
    }
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let port = std::env::var("APP_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8080".into());
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        port
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
