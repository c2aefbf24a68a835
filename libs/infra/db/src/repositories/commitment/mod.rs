// [libs/infra/db/src/repositories/commitment/mod.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT STORE (V3.3 - LEDGER GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA ACID DE FILAS DE COMPROMISO
 *
 * VISION 2026:
 * 1. TRANSACTION NEUTRAL: Toda operación recibe la conexión del
 *    llamante; los orquestadores deciden el perímetro transaccional y
 *    la transacción revierte al soltarse sin commit.
 * 2. HISTORY PRESERVED: Las filas Superseded/Expired nunca se borran;
 *    los listados las filtran por defecto.
 * =================================================================
 */

pub mod queries;

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row};
use rand::RngCore;
use tracing::debug;

use custos_domain_models::commitment::{
    CommitmentStatus, CommitmentWorkflowContext, ProjectCommitment, TransferStatus,
};

use crate::errors::DbError;
use crate::repositories::rowmap::{
    amount_at, bool_at, fmt_instant, fmt_opt_instant, instant_at, int_at, opt_instant_at,
    opt_text_at, opt_text_value, text_at,
};

use self::queries as sql_registry;

/// Bytes de entropía del token de transferencia (48 dígitos hex).
const TRANSFER_TOKEN_ENTROPY_BYTES: usize = 24;

/// Genera un token de transferencia opaco. La unicidad global la
/// garantiza el índice UNIQUE del ledger.
pub fn generate_transfer_token() -> String {
    let mut entropy = [0u8; TRANSFER_TOKEN_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut entropy);
    hex::encode(entropy)
}

/// Autoridad de persistencia del ledger de compromisos. Sin estado: cada
/// función opera sobre la conexión (o transacción) del llamante.
pub struct CommitmentStore;

impl CommitmentStore {
    /// Inserta la fila y devuelve su id recién acuñado.
    pub async fn insert(
        connection: &Connection,
        commitment: &ProjectCommitment,
    ) -> Result<i64, DbError> {
        let creation_context_json = serde_json::to_string(&commitment.creation_context)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let supersede_context_json = encode_optional_context(&commitment.supersede_context)?;
        let renew_context_json = encode_optional_context(&commitment.renew_context)?;

        connection
            .execute(
                sql_registry::INSERT_COMMITMENT,
                params![
                    commitment.uuid.as_str(),
                    commitment.project_id,
                    commitment.az_resource_id,
                    commitment.amount as i64,
                    commitment.duration.to_string(),
                    fmt_instant(commitment.created_at),
                    commitment.creator_uuid.as_str(),
                    commitment.creator_name.as_str(),
                    fmt_opt_instant(commitment.confirm_by),
                    fmt_opt_instant(commitment.confirmed_at),
                    fmt_instant(commitment.expires_at),
                    fmt_opt_instant(commitment.superseded_at),
                    commitment.status.as_str(),
                    commitment.transfer_status.as_str(),
                    opt_text_value(commitment.transfer_token.as_deref()),
                    fmt_opt_instant(commitment.transfer_started_at),
                    commitment.notify_on_confirm as i64,
                    commitment.notified_for_expiration as i64,
                    creation_context_json,
                    opt_text_value(supersede_context_json.as_deref()),
                    opt_text_value(renew_context_json.as_deref())
                ],
            )
            .await?;

        let mut rows = connection.query("SELECT last_insert_rowid()", ()).await?;
        let row = rows.next().await?.ok_or(DbError::TransactionError)?;
        let new_row_id = int_at(&row, 0)?;

        debug!("📥 [LEDGER]: Commitment [{}] sealed as row {}.", commitment.uuid, new_row_id);
        Ok(new_row_id)
    }

    pub async fn find_by_id_in_project(
        connection: &Connection,
        commitment_id: i64,
        project_id: i64,
    ) -> Result<ProjectCommitment, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::FIND_BY_ID_IN_PROJECT),
                params![commitment_id, project_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::CommitmentNotFound)?;
        map_commitment_row(&row)
    }

    pub async fn find_by_uuid(
        connection: &Connection,
        commitment_uuid: &str,
    ) -> Result<ProjectCommitment, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::FIND_BY_UUID),
                params![commitment_uuid],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::CommitmentNotFound)?;
        map_commitment_row(&row)
    }

    /// Localiza por token de transferencia. El token es la credencial del
    /// contraparte; su ausencia es 404, nunca 403.
    pub async fn find_by_transfer_token(
        connection: &Connection,
        transfer_token: &str,
    ) -> Result<ProjectCommitment, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::FIND_BY_TOKEN),
                params![transfer_token],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::TransferTokenNotFound)?;
        map_commitment_row(&row)
    }

    pub async fn list_for_project(
        connection: &Connection,
        project_id: i64,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_FOR_PROJECT),
                params![project_id],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    pub async fn list_public_offers_for_resource(
        connection: &Connection,
        resource_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_PUBLIC_OFFERS_FOR_RESOURCE),
                params![resource_id, fmt_instant(now)],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    /// Ofertas públicas de otros proyectos sobre la misma AZResource,
    /// ordenadas para el consumo voraz de la caché transferible.
    pub async fn list_claimable_offers(
        connection: &Connection,
        az_resource_id: i64,
        claiming_project_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_CLAIMABLE_OFFERS),
                params![az_resource_id, claiming_project_id, fmt_instant(now)],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    /// Total confirmado: el escalar que viaja al backend.
    pub async fn sum_confirmed(
        connection: &Connection,
        project_id: i64,
        az_resource_id: i64,
    ) -> Result<u64, DbError> {
        let mut rows = connection
            .query(sql_registry::SUM_CONFIRMED, params![project_id, az_resource_id])
            .await?;
        let row = rows.next().await?.ok_or(DbError::TransactionError)?;
        amount_at(&row, 0)
    }

    // --- TRANSICIONES ---

    pub async fn mark_superseded(
        connection: &Connection,
        commitment_id: i64,
        supersede_context: &CommitmentWorkflowContext,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let context_json = serde_json::to_string(supersede_context)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let affected = connection
            .execute(
                sql_registry::MARK_SUPERSEDED,
                params![commitment_id, fmt_instant(now), context_json],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::CommitmentNotFound);
        }
        Ok(())
    }

    pub async fn confirm(
        connection: &Connection,
        commitment_id: i64,
        confirmed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let affected = connection
            .execute(
                sql_registry::CONFIRM_COMMITMENT,
                params![commitment_id, fmt_instant(confirmed_at)],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::CommitmentNotFound);
        }
        Ok(())
    }

    pub async fn mark_pending(connection: &Connection, commitment_id: i64) -> Result<(), DbError> {
        connection
            .execute(sql_registry::MARK_PENDING, params![commitment_id])
            .await?;
        Ok(())
    }

    pub async fn mark_expired(connection: &Connection, commitment_id: i64) -> Result<(), DbError> {
        connection
            .execute(sql_registry::MARK_EXPIRED, params![commitment_id])
            .await?;
        Ok(())
    }

    pub async fn set_renew_context(
        connection: &Connection,
        commitment_id: i64,
        renew_context: &CommitmentWorkflowContext,
    ) -> Result<(), DbError> {
        let context_json = serde_json::to_string(renew_context)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        connection
            .execute(sql_registry::SET_RENEW_CONTEXT, params![commitment_id, context_json])
            .await?;
        Ok(())
    }

    pub async fn update_transfer_state(
        connection: &Connection,
        commitment_id: i64,
        transfer_status: TransferStatus,
        transfer_token: Option<&str>,
        transfer_started_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        connection
            .execute(
                sql_registry::UPDATE_TRANSFER_STATE,
                params![
                    commitment_id,
                    transfer_status.as_str(),
                    opt_text_value(transfer_token),
                    fmt_opt_instant(transfer_started_at)
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn reassign_project(
        connection: &Connection,
        commitment_id: i64,
        target_project_id: i64,
    ) -> Result<(), DbError> {
        let affected = connection
            .execute(sql_registry::REASSIGN_PROJECT, params![commitment_id, target_project_id])
            .await?;
        if affected == 0 {
            return Err(DbError::CommitmentNotFound);
        }
        Ok(())
    }

    pub async fn update_duration(
        connection: &Connection,
        commitment_id: i64,
        duration: &custos_domain_models::CommitmentDuration,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        connection
            .execute(
                sql_registry::UPDATE_DURATION,
                params![commitment_id, duration.to_string(), fmt_instant(new_expires_at)],
            )
            .await?;
        Ok(())
    }

    pub async fn delete_row(connection: &Connection, commitment_id: i64) -> Result<(), DbError> {
        let affected = connection
            .execute(sql_registry::DELETE_COMMITMENT, params![commitment_id])
            .await?;
        if affected == 0 {
            return Err(DbError::CommitmentNotFound);
        }
        Ok(())
    }

    // --- CONSULTAS DE RELOJ (SWEEP) ---

    pub async fn list_planned_due(
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_PLANNED_DUE),
                params![fmt_instant(now)],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    pub async fn list_pending(connection: &Connection) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(&sql_registry::with_projection(sql_registry::LIST_PENDING), ())
            .await?;
        collect_commitments(&mut rows).await
    }

    pub async fn list_confirmed_past_expiry(
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_CONFIRMED_PAST_EXPIRY),
                params![fmt_instant(now)],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    pub async fn list_expiring_unnotified(
        connection: &Connection,
        notice_horizon: DateTime<Utc>,
    ) -> Result<Vec<ProjectCommitment>, DbError> {
        let mut rows = connection
            .query(
                &sql_registry::with_projection(sql_registry::LIST_EXPIRING_UNNOTIFIED),
                params![fmt_instant(notice_horizon)],
            )
            .await?;
        collect_commitments(&mut rows).await
    }

    pub async fn mark_expiry_notified(
        connection: &Connection,
        commitment_id: i64,
    ) -> Result<(), DbError> {
        connection
            .execute(sql_registry::MARK_EXPIRY_NOTIFIED, params![commitment_id])
            .await?;
        Ok(())
    }
}

fn encode_optional_context(
    context: &Option<CommitmentWorkflowContext>,
) -> Result<Option<String>, DbError> {
    match context {
        None => Ok(None),
        Some(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|fault| DbError::MappingError(fault.to_string())),
    }
}

fn decode_optional_context(
    raw: Option<String>,
) -> Result<Option<CommitmentWorkflowContext>, DbError> {
    match raw {
        None => Ok(None),
        Some(payload) => serde_json::from_str(&payload)
            .map(Some)
            .map_err(|fault| DbError::MappingError(fault.to_string())),
    }
}

async fn collect_commitments(rows: &mut libsql::Rows) -> Result<Vec<ProjectCommitment>, DbError> {
    let mut collected = Vec::new();
    while let Some(row) = rows.next().await? {
        collected.push(map_commitment_row(&row)?);
    }
    Ok(collected)
}

/// Transforma una proyección completa del ledger en la entidad de dominio.
fn map_commitment_row(row: &Row) -> Result<ProjectCommitment, DbError> {
    let duration_raw = text_at(row, 5)?;
    let status_raw = text_at(row, 13)?;
    let transfer_status_raw = text_at(row, 14)?;
    let creation_context_raw = text_at(row, 19)?;

    Ok(ProjectCommitment {
        id: int_at(row, 0)?,
        uuid: text_at(row, 1)?,
        project_id: int_at(row, 2)?,
        az_resource_id: int_at(row, 3)?,
        amount: amount_at(row, 4)?,
        duration: duration_raw
            .parse()
            .map_err(|fault: String| DbError::MappingError(fault))?,
        created_at: instant_at(row, 6)?,
        creator_uuid: text_at(row, 7)?,
        creator_name: text_at(row, 8)?,
        confirm_by: opt_instant_at(row, 9)?,
        confirmed_at: opt_instant_at(row, 10)?,
        expires_at: instant_at(row, 11)?,
        superseded_at: opt_instant_at(row, 12)?,
        status: CommitmentStatus::parse(&status_raw)
            .ok_or_else(|| DbError::MappingError(format!("unknown status {:?}", status_raw)))?,
        transfer_status: TransferStatus::parse(&transfer_status_raw).ok_or_else(|| {
            DbError::MappingError(format!("unknown transfer status {:?}", transfer_status_raw))
        })?,
        transfer_token: opt_text_at(row, 15)?,
        transfer_started_at: opt_instant_at(row, 16)?,
        notify_on_confirm: bool_at(row, 17)?,
        notified_for_expiration: bool_at(row, 18)?,
        creation_context: serde_json::from_str(&creation_context_raw)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?,
        supersede_context: decode_optional_context(opt_text_at(row, 20)?)?,
        renew_context: decode_optional_context(opt_text_at(row, 21)?)?,
    })
}
