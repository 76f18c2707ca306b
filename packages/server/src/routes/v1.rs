use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/documents", document_routes(config))
}

fn document_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::document::list_documents,
            handlers::document::upload_document
        ))
        .routes(routes!(handlers::document::fetch_document))
        .routes(routes!(
            handlers::document::get_document,
            handlers::document::delete_document
        ))
        .routes(routes!(handlers::document::download_document))
        .layer(handlers::document::document_upload_body_limit(
            config.storage.max_upload_size,
        ))
}
