use axum::{
    extract::State,
    http::StatusCode,
    middleware::map_response_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::{AppError, NotFoundPage};
use crate::state::AppState;
use crate::{posts, tags, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(posts::router())
        .merge(users::router())
        .merge(tags::router())
        .route("/health", get(|| async { "ok" }))
        .fallback(fallback)
        .layer(map_response_with_state(state.clone(), render_not_found))
        .with_state(state)
        .layer(CorsLayer::permissive())
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

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Swaps the body of any [`AppError::NotFound`] response for the 404 page.
async fn render_not_found(State(state): State<AppState>, response: Response) -> Response {
    if response.extensions().get::<NotFoundPage>().is_none() {
        return response;
    }
    match state.views.not_found() {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "404 page failed to render");
            response
        }
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
