// [apps/orchestrator/src/handlers/commitment.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT API HANDLERS (V3.3 - SURFACE ADAPTERS)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TRADUCCIÓN HTTP <-> ORQUESTADORES DEL CICLO DE VIDA
 *
 * Los adaptadores extraen identidad y parámetros, delegan en el
 * servicio y devuelven la forma de presentación. La lógica vive en
 * los orquestadores; aquí solo hay traducción.
 * =================================================================
 */

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::lifecycle::conversion::ConvertCommitmentCommand;
use crate::services::lifecycle::creation::CreateCommitmentCommand;
use crate::services::lifecycle::merging::MergeCommitmentsCommand;
use crate::services::lifecycle::renewal::UpdateDurationCommand;
use crate::services::lifecycle::transfer::StartTransferCommand;
use crate::state::AppState;

/// Cabecera que porta la credencial de aceptación de transferencia.
const TRANSFER_TOKEN_HEADER: &str = "Transfer-Token";

/// Parámetros del listado público.
#[derive(Debug, Deserialize)]
pub struct PublicListingParams {
    pub service: String,
    pub resource: String,
}

pub struct CommitmentHandler;

impl CommitmentHandler {
    /// GET /v1/domains/:d/projects/:p/commitments
    #[instrument(skip(application_state, grant))]
    pub async fn handle_list_commitments(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid)): Path<(String, String)>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let commitments = application_state
            .lifecycle_service
            .list_project_commitments(&grant, &domain_uuid, &project_uuid)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "commitments": commitments }))))
    }

    /// GET /v1/public-commitments?service=&resource=
    #[instrument(skip(application_state, grant))]
    pub async fn handle_list_public_commitments(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Query(params): Query<PublicListingParams>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let commitments = application_state
            .lifecycle_service
            .list_public_commitments(&grant, &params.service, &params.resource)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "commitments": commitments }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/new
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_create_commitment(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid)): Path<(String, String)>,
        Json(command): Json<CreateCommitmentCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let created = application_state
            .lifecycle_service
            .create_commitment(&grant, &domain_uuid, &project_uuid, command)
            .await?;
        Ok((StatusCode::CREATED, Json(json!({ "commitment": created }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/can-confirm
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_can_confirm_commitment(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid)): Path<(String, String)>,
        Json(command): Json<CreateCommitmentCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let verdict = application_state
            .lifecycle_service
            .can_confirm_commitment(&grant, &domain_uuid, &project_uuid, command)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "result": verdict }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/merge
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_merge_commitments(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid)): Path<(String, String)>,
        Json(command): Json<MergeCommitmentsCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let merged = application_state
            .lifecycle_service
            .merge_commitments(&grant, &domain_uuid, &project_uuid, command)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": merged }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/:id/renew
    #[instrument(skip(application_state, grant))]
    pub async fn handle_renew_commitment(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let renewal = application_state
            .lifecycle_service
            .renew_commitment(&grant, &domain_uuid, &project_uuid, commitment_id)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": renewal }))))
    }

    /// DELETE /v1/domains/:d/projects/:p/commitments/:id
    #[instrument(skip(application_state, grant))]
    pub async fn handle_delete_commitment(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        application_state
            .lifecycle_service
            .delete_commitment(&grant, &domain_uuid, &project_uuid, commitment_id)
            .await?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// POST /v1/domains/:d/projects/:p/commitments/:id/start-transfer
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_start_transfer(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
        Json(command): Json<StartTransferCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let updated = application_state
            .lifecycle_service
            .start_transfer(&grant, &domain_uuid, &project_uuid, commitment_id, command)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": updated }))))
    }

    /// GET /v1/commitments/:token
    #[instrument(skip(application_state, grant, transfer_token))]
    pub async fn handle_show_commitment_by_token(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path(transfer_token): Path<String>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let commitment = application_state
            .lifecycle_service
            .find_commitment_by_token(&grant, &transfer_token)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": commitment }))))
    }

    /// POST /v1/domains/:d/projects/:p/transfer-commitment/:id
    #[instrument(skip(application_state, grant, headers))]
    pub async fn handle_accept_transfer(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
        headers: HeaderMap,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let transfer_token = headers
            .get(TRANSFER_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                LifecycleError::BadRequest("Transfer-Token header is missing".into())
            })?;

        let moved = application_state
            .lifecycle_service
            .accept_transfer(&grant, &domain_uuid, &project_uuid, commitment_id, transfer_token)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": moved }))))
    }

    /// GET /v1/commitment-conversion/:service/:resource
    #[instrument(skip(application_state, grant))]
    pub async fn handle_list_conversions(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((api_service_type, api_resource_name)): Path<(String, String)>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let conversions = application_state
            .lifecycle_service
            .list_conversion_targets(&grant, &api_service_type, &api_resource_name)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "conversions": conversions }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/:id/convert
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_convert_commitment(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
        Json(command): Json<ConvertCommitmentCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let converted = application_state
            .lifecycle_service
            .convert_commitment(&grant, &domain_uuid, &project_uuid, commitment_id, command)
            .await?;
        Ok((StatusCode::ACCEPTED, Json(json!({ "commitment": converted }))))
    }

    /// POST /v1/domains/:d/projects/:p/commitments/:id/update-duration
    #[instrument(skip(application_state, grant, command))]
    pub async fn handle_update_duration(
        State(application_state): State<AppState>,
        Extension(grant): Extension<OperatorGrant>,
        Path((domain_uuid, project_uuid, commitment_id)): Path<(String, String, i64)>,
        Json(command): Json<UpdateDurationCommand>,
    ) -> Result<impl IntoResponse, LifecycleError> {
        let updated = application_state
            .lifecycle_service
            .update_commitment_duration(
                &grant,
                &domain_uuid,
                &project_uuid,
                commitment_id,
                command,
            )
            .await?;
        Ok((StatusCode::OK, Json(json!({ "commitment": updated }))))
    }
}
