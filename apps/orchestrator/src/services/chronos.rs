// [apps/orchestrator/src/services/chronos.rs]
/*!
 * =================================================================
 * APARATO: CHRONOS CLOCK SWEEP (V3.3 - LIFECYCLE PACEMAKER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: TRANSICIONES DE RELOJ DEL CICLO DE VIDA
 *
 * VISION 2026:
 * 1. CLOCK TRANSITIONS: Planned->Pending al alcanzar confirm_by;
 *    Pending->Confirmed previa aceptación del backend; Confirmed->
 *    Expired al alcanzar expires_at.
 * 2. HERALD WINDOW: Filas Confirmed que entran en los últimos 30 días
 *    sin renovación encolan un aviso de pre-expiración una sola vez.
 * 3. TIME AUTHORITY: El reloj es inyectable y congelable para el
 *    proving grounds.
 * =================================================================
 */

use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::commitment::{CommitmentStatus, ProjectCommitment};
use custos_domain_models::config::ClusterConfig;
use custos_infra_db::repositories::{
    CatalogRepository, CommitmentStore, MailQueueRepository, TenancyRepository,
};
use custos_infra_db::{DbError, LedgerClient};
use custos_infra_liquid::LiquidGateway;

use crate::services::event_bus::EventBus;

/// Días previos a la expiración en los que se emite el aviso.
const EXPIRATION_NOTICE_WINDOW_DAYS: i64 = 30;

/// Autoridad de tiempo del proceso. El reloj del sistema por defecto;
/// congelable para escenarios deterministas.
#[derive(Debug, Default)]
pub struct TimeAuthority {
    frozen_instant: RwLock<Option<DateTime<Utc>>>,
}

impl TimeAuthority {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.frozen_instant
            .read()
            .expect("time authority lock poisoned")
            .unwrap_or_else(Utc::now)
    }

    /// Congela el reloj en un instante concreto.
    pub fn freeze_at(&self, instant: DateTime<Utc>) {
        *self
            .frozen_instant
            .write()
            .expect("time authority lock poisoned") = Some(instant);
    }

    pub fn unfreeze(&self) {
        *self
            .frozen_instant
            .write()
            .expect("time authority lock poisoned") = None;
    }
}

/// Barrido periódico del reloj sobre el ledger de compromisos.
pub struct ChronosSweep {
    database_client: LedgerClient,
    liquid_gateway: Arc<LiquidGateway>,
    cluster_config: Arc<ClusterConfig>,
    event_bus: Arc<EventBus>,
    time_authority: Arc<TimeAuthority>,
}

impl ChronosSweep {
    pub fn new(
        database_client: LedgerClient,
        liquid_gateway: Arc<LiquidGateway>,
        cluster_config: Arc<ClusterConfig>,
        event_bus: Arc<EventBus>,
        time_authority: Arc<TimeAuthority>,
    ) -> Self {
        Self {
            database_client,
            liquid_gateway,
            cluster_config,
            event_bus,
            time_authority,
        }
    }

    /// Lanza el bucle de barrido en el runtime de Tokio.
    pub fn ignite_sweep_loop(self: Arc<Self>, sweep_period_seconds: u64) {
        info!(
            "🕰️ [CHRONOS]: Clock sweep ignited with a {}s period.",
            sweep_period_seconds
        );

        tokio::spawn(async move {
            let mut sweep_ticker = interval(Duration::from_secs(sweep_period_seconds));
            loop {
                sweep_ticker.tick().await;
                if let Err(sweep_fault) = self.run_sweep_cycle().await {
                    warn!("⚠️ [CHRONOS]: Sweep cycle aborted: {}", sweep_fault);
                }
            }
        });
    }

    /// Un ciclo completo de barrido. Expuesto para el proving grounds.
    #[instrument(skip(self))]
    pub async fn run_sweep_cycle(&self) -> Result<(), DbError> {
        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;

        // FASE 1: Planned -> Pending al alcanzar confirm_by.
        for due_commitment in CommitmentStore::list_planned_due(&connection, now).await? {
            CommitmentStore::mark_pending(&connection, due_commitment.id).await?;
            debug!(
                "⏳ [CHRONOS]: Commitment [{}] now pending confirmation.",
                due_commitment.uuid
            );
        }

        // FASE 2: Pending -> Confirmed previa aceptación del backend.
        self.attempt_pending_confirmations(now).await?;

        // FASE 3: Confirmed -> Expired al alcanzar expires_at.
        for expired_commitment in
            CommitmentStore::list_confirmed_past_expiry(&connection, now).await?
        {
            CommitmentStore::mark_expired(&connection, expired_commitment.id).await?;
            info!(
                "🥀 [CHRONOS]: Commitment [{}] expired at {}.",
                expired_commitment.uuid, expired_commitment.expires_at
            );
        }

        // FASE 4: Avisos de pre-expiración (una sola vez por fila).
        let notice_horizon = now + TimeDelta::days(EXPIRATION_NOTICE_WINDOW_DAYS);
        for expiring_commitment in
            CommitmentStore::list_expiring_unnotified(&connection, notice_horizon).await?
        {
            self.queue_expiration_notice(&connection, &expiring_commitment, now)
                .await?;
        }

        Ok(())
    }

    /// Agrupa las filas Pending por (proyecto, AZResource) y somete cada
    /// grupo al diálogo de aceptación con totales before/after.
    async fn attempt_pending_confirmations(&self, now: DateTime<Utc>) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let mut pending_groups: BTreeMap<(i64, i64), Vec<ProjectCommitment>> = BTreeMap::new();
        for pending_commitment in CommitmentStore::list_pending(&connection).await? {
            pending_groups
                .entry((pending_commitment.project_id, pending_commitment.az_resource_id))
                .or_default()
                .push(pending_commitment);
        }

        for ((project_id, az_resource_id), group) in pending_groups {
            let az_context = CatalogRepository::az_resource_context(&connection, az_resource_id).await?;
            let project_metadata = TenancyRepository::project_metadata(&connection, project_id).await?;

            let service_info = match self.liquid_gateway.service_info(&az_context.service_type) {
                Ok(info) => info,
                Err(registry_fault) => {
                    warn!("⚠️ [CHRONOS]: {}", registry_fault);
                    continue;
                }
            };

            // Respetar minConfirmDate si el comportamiento lo declara.
            let min_confirm_gate = self
                .cluster_config
                .commitment_behavior(
                    &az_context.service_type,
                    &az_context.resource_name,
                    &project_metadata.domain_name,
                )
                .and_then(|behavior| behavior.min_confirm_date);
            if matches!(min_confirm_gate, Some(gate) if now < gate) {
                continue;
            }

            let transaction = connection
                .transaction()
                .await
                .map_err(|_| DbError::TransactionError)?;

            let total_before =
                CommitmentStore::sum_confirmed(&transaction, project_id, az_resource_id).await?;
            let group_amount: u64 = group.iter().map(|commitment| commitment.amount).sum();

            let mut builder =
                ChangeRequestBuilder::new(az_context.availability_zone.clone(), service_info.version);
            builder.set_confirmed_totals(
                &project_metadata,
                &az_context.resource_name,
                total_before,
                total_before + group_amount,
            );
            for pending_commitment in &group {
                builder.record_transition(
                    &project_metadata,
                    &az_context.resource_name,
                    pending_commitment,
                    Some(CommitmentStatus::Confirmed),
                );
            }

            let change_request = builder.build();
            let verdict = match self
                .liquid_gateway
                .change_commitments(&az_context.service_type, &change_request)
                .await
            {
                Ok(verdict) => verdict,
                Err(gateway_fault) => {
                    warn!("⚠️ [CHRONOS]: Confirmation dialogue failed: {}", gateway_fault);
                    continue;
                }
            };

            if verdict.is_rejection() {
                debug!(
                    "⛔ [CHRONOS]: Backend deferred confirmation for project {} ({}); retry_at={:?}.",
                    project_metadata.uuid, verdict.rejection_reason, verdict.retry_at
                );
                continue;
            }

            for pending_commitment in &group {
                CommitmentStore::confirm(&transaction, pending_commitment.id, now).await?;
            }
            transaction.commit().await.map_err(|_| DbError::TransactionError)?;

            info!(
                "✅ [CHRONOS]: {} commitment(s) confirmed for project {} on {}/{}.",
                group.len(),
                project_metadata.uuid,
                az_context.service_type,
                az_context.resource_name
            );

            // Los totales cambiaron: las cuotas usables deben recomputarse.
            CatalogRepository::request_capacity_rescrape(&connection, &az_context.service_type, now)
                .await?;
            self.event_bus.broadcast_rescrape_requested(&az_context.service_type);

            for confirmed_commitment in &group {
                if confirmed_commitment.notify_on_confirm {
                    let subject = "Your commitment was confirmed";
                    let body_json = serde_json::json!({
                        "commitment_uuid": confirmed_commitment.uuid,
                        "service_type": az_context.service_type,
                        "resource_name": az_context.resource_name,
                        "availability_zone": az_context.availability_zone,
                        "amount": confirmed_commitment.amount,
                        "confirmed_at": now.to_rfc3339(),
                    })
                    .to_string();

                    MailQueueRepository::enqueue(
                        &connection,
                        confirmed_commitment.project_id,
                        subject,
                        &body_json,
                        now,
                    )
                    .await?;
                    self.event_bus.broadcast_mail_queued(&project_metadata.uuid, subject);
                }
            }
        }

        Ok(())
    }

    async fn queue_expiration_notice(
        &self,
        connection: &libsql::Connection,
        expiring_commitment: &ProjectCommitment,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let az_context =
            CatalogRepository::az_resource_context(connection, expiring_commitment.az_resource_id)
                .await?;
        let project_metadata =
            TenancyRepository::project_metadata(connection, expiring_commitment.project_id).await?;

        let subject = "Your commitment is about to expire";
        let body_json = serde_json::json!({
            "commitment_uuid": expiring_commitment.uuid,
            "service_type": az_context.service_type,
            "resource_name": az_context.resource_name,
            "availability_zone": az_context.availability_zone,
            "amount": expiring_commitment.amount,
            "expires_at": expiring_commitment.expires_at.to_rfc3339(),
        })
        .to_string();

        MailQueueRepository::enqueue(
            connection,
            expiring_commitment.project_id,
            subject,
            &body_json,
            now,
        )
        .await?;
        CommitmentStore::mark_expiry_notified(connection, expiring_commitment.id).await?;
        self.event_bus.broadcast_mail_queued(&project_metadata.uuid, subject);

        debug!(
            "📮 [CHRONOS]: Expiration notice queued for commitment [{}].",
            expiring_commitment.uuid
        );
        Ok(())
    }
}
