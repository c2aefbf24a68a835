// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ROUTING MATRIX (V3.2 - COMMITMENT SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA HTTP DEL CICLO DE VIDA DE COMPROMISOS
 * =================================================================
 */

use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::commitment::CommitmentHandler;
use crate::middleware::auth_guard;
use crate::state::AppState;

pub fn create_router(application_shared_state: AppState) -> Router {
    // Escudo de red para herramientas de operación.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE PROYECTO: operaciones bajo /domains/:d/projects/:p.
    let project_commitment_stratum = Router::new()
        .route("/commitments", get(CommitmentHandler::handle_list_commitments))
        .route("/commitments/new", post(CommitmentHandler::handle_create_commitment))
        .route(
            "/commitments/can-confirm",
            post(CommitmentHandler::handle_can_confirm_commitment),
        )
        .route("/commitments/merge", post(CommitmentHandler::handle_merge_commitments))
        .route(
            "/commitments/:commitment_id/renew",
            post(CommitmentHandler::handle_renew_commitment),
        )
        .route(
            "/commitments/:commitment_id",
            delete(CommitmentHandler::handle_delete_commitment),
        )
        .route(
            "/commitments/:commitment_id/start-transfer",
            post(CommitmentHandler::handle_start_transfer),
        )
        .route(
            "/commitments/:commitment_id/convert",
            post(CommitmentHandler::handle_convert_commitment),
        )
        .route(
            "/commitments/:commitment_id/update-duration",
            post(CommitmentHandler::handle_update_duration),
        )
        .route(
            "/transfer-commitment/:commitment_id",
            post(CommitmentHandler::handle_accept_transfer),
        );

    // ESTRATO DE CLUSTER: lecturas transversales.
    let cluster_stratum = Router::new()
        .route(
            "/public-commitments",
            get(CommitmentHandler::handle_list_public_commitments),
        )
        .route(
            "/commitments/:transfer_token",
            get(CommitmentHandler::handle_show_commitment_by_token),
        )
        .route(
            "/commitment-conversion/:service/:resource",
            get(CommitmentHandler::handle_list_conversions),
        );

    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest(
            "/v1",
            Router::new()
                .nest(
                    "/domains/:domain_id/projects/:project_id",
                    project_commitment_stratum,
                )
                .merge(cluster_stratum)
                .layer(middleware::from_fn_with_state(
                    application_shared_state.clone(),
                    auth_guard,
                )),
        )
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
