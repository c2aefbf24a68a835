// [apps/orchestrator/src/services/transfer_pool.rs]
/*!
 * =================================================================
 * APARATO: TRANSFERABLE COMMITMENT POOL (V3.1 - CLAIM PLANNER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CONSULTA PRE-CONFIRMACIÓN DE OFERTAS PÚBLICAS
 *
 * Ayudante in-transaction acotado a UNA llamada de creación con
 * confirmación inmediata: enumera ofertas Public/Confirmed/no
 * expiradas de otros proyectos sobre la misma AZResource y decide si
 * el consumo voraz de ofertas completas cubre la cantidad solicitada.
 * Si no hay cobertura exacta, el llamante emite la petición plana.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::Connection;
use tracing::debug;

use custos_domain_models::commitment::ProjectCommitment;
use custos_infra_db::repositories::CommitmentStore;
use custos_infra_db::DbError;

/// Plan de consumo: ofertas completas cuya suma cubre exactamente la
/// cantidad solicitada.
#[derive(Debug)]
pub struct ClaimPlan {
    pub claims: Vec<ProjectCommitment>,
}

impl ClaimPlan {
    pub fn total_claimed(&self) -> u64 {
        self.claims.iter().map(|claim| claim.amount).sum()
    }
}

pub struct TransferPool;

impl TransferPool {
    /// Construye el plan de consumo, o None si las ofertas vigentes no
    /// cubren exactamente la cantidad solicitada.
    ///
    /// Voraz sobre ofertas ordenadas por cantidad descendente; solo se
    /// consumen ofertas COMPLETAS (cada una se supersede y renace bajo
    /// el proyecto reclamante).
    pub async fn plan_claims(
        connection: &Connection,
        az_resource_id: i64,
        claiming_project_id: i64,
        requested_amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<ClaimPlan>, DbError> {
        let published_offers = CommitmentStore::list_claimable_offers(
            connection,
            az_resource_id,
            claiming_project_id,
            now,
        )
        .await?;

        let mut remaining_need = requested_amount;
        let mut selected_claims = Vec::new();

        for offer in published_offers {
            if remaining_need == 0 {
                break;
            }
            if offer.amount <= remaining_need {
                remaining_need -= offer.amount;
                selected_claims.push(offer);
            }
        }

        if remaining_need > 0 || selected_claims.is_empty() {
            return Ok(None);
        }

        debug!(
            "♻️ [TRANSFER_POOL]: {} offer(s) cover the requested amount of {}.",
            selected_claims.len(),
            requested_amount
        );
        Ok(Some(ClaimPlan { claims: selected_claims }))
    }
}
