use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use tracing::Instrument;

use crate::handlers::schools::{create_school, list_schools};
use crate::handlers::uploads::serve_upload;
use crate::service::school_service::SchoolService;
use crate::storage::LocalImageStorage;

/// Room for the text parts and multipart framing on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct DirectoryState {
    pub service: SchoolService,
    /// Set when images are written locally and must be served by this process.
    pub uploads: Option<LocalImageStorage>,
}

impl DirectoryState {
    pub fn new(service: SchoolService) -> Self {
        Self {
            service,
            uploads: None,
        }
    }

    pub fn with_local_uploads(mut self, uploads: LocalImageStorage) -> Self {
        self.uploads = Some(uploads);
        self
    }
}

pub fn directory_router(state: DirectoryState) -> Router {
    let body_limit = state
        .service
        .max_image_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);

    let mut router = Router::new().route("/api/schools", get(list_schools).post(create_school));

    if let Some(uploads) = state.uploads.as_ref() {
        let path = format!("{}/{{file}}", uploads.url_prefix());
        router = router.route(&path, get(serve_upload));
    }

    router
        .layer(from_fn(request_span))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn request_span(request: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = %response.status(), "request finished"));
    response
}
