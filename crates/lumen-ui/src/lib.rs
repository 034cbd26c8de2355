//! Browser frontend for lumen, embedded into the server binary.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "assets"]
struct Assets;

/// Routes serving the page at `/` and its files under `/assets/`.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/assets/{*path}", get(static_handler))
}

async fn index() -> Response {
    serve("index.html")
}

async fn static_handler(Path(path): Path<String>) -> Response {
    serve(path.trim_start_matches('/'))
}

fn serve(path: &str) -> Response {
    let Some(content) = Assets::get(path) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();

    (
        [(header::CONTENT_TYPE, mime.to_string())],
        content.data.into_owned(),
    )
        .into_response()
}
