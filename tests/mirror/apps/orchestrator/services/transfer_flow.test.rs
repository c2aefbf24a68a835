// [tests/mirror/apps/orchestrator/services/transfer_flow.test.rs]
/*!
 * =================================================================
 * APARATO: TRANSFER FLOW CERTIFIER (V3.3 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: SPLIT PARCIAL, UNICIDAD DE TOKEN Y MOVIMIENTO
 *                  ATÓMICO ENTRE PROYECTOS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use custos_domain_models::commitment::{CommitmentStatus, TransferStatus};
    use custos_domain_models::config::ClusterConfig;
    use custos_domain_models::resource::{ResourceInfo, ResourceTopology, ServiceInfo};
    use custos_infra_db::repositories::CommitmentStore;
    use custos_infra_db::{DbError, LedgerClient};
    use custos_infra_liquid::{LiquidConduit, LiquidGateway, ScriptedConduit};
    use custos_orchestrator::bootstrap::synchronize_cluster;
    use custos_orchestrator::errors::LifecycleError;
    use custos_orchestrator::middleware::{GrantRegistry, OperatorGrant};
    use custos_orchestrator::services::chronos::TimeAuthority;
    use custos_orchestrator::services::lifecycle::creation::CreateCommitmentCommand;
    use custos_orchestrator::services::lifecycle::transfer::StartTransferCommand;
    use custos_orchestrator::state::AppState;

    fn declared_service_info() -> ServiceInfo {
        let mut resources = BTreeMap::new();
        resources.insert(
            "things".to_string(),
            ResourceInfo {
                unit: Default::default(),
                topology: ResourceTopology::AzAware,
                has_quota: true,
            },
        );
        ServiceInfo { version: 1, resources, rates: Vec::new() }
    }

    fn proving_cluster_config() -> ClusterConfig {
        serde_json::from_value(serde_json::json!({
            "availability_zones": ["az-one", "az-two"],
            "services": [{
                "service_type": "shared",
                "resources": [
                    { "name": "things", "commitment": {
                        "permitted_durations": ["1 hour", "1 day"]
                    }}
                ]
            }],
            "seed_domains": [{
                "name": "germany", "uuid": "uuid-germany",
                "projects": [
                    { "name": "berlin", "uuid": "uuid-berlin" },
                    { "name": "dresden", "uuid": "uuid-dresden" }
                ]
            }]
        }))
        .expect("proving cluster config must parse")
    }

    async fn assemble_proving_grounds(db_label: &str) -> (AppState, OperatorGrant) {
        let database_client = LedgerClient::connect(
            &format!("file:{}?mode=memory&cache=shared", db_label),
            None,
        )
        .await
        .expect("in-memory ledger must anchor");

        let cluster_config = Arc::new(proving_cluster_config());
        let liquid_gateway = Arc::new(LiquidGateway::new());
        liquid_gateway
            .register_service(
                "shared",
                LiquidConduit::Scripted(ScriptedConduit::new(declared_service_info())),
            )
            .await
            .expect("scripted driver registration");

        synchronize_cluster(&database_client, &cluster_config, &liquid_gateway)
            .await
            .expect("catalog and tenancy sync");

        let state = AppState::assemble(
            database_client,
            cluster_config,
            liquid_gateway,
            Arc::new(GrantRegistry::from_specification(
                "secret=project:show,project:edit,cluster:show_basic,cluster:edit",
            )),
            Arc::new(TimeAuthority::system()),
        );
        (state, OperatorGrant::omnipotent_for_tests("proving-architect"))
    }

    async fn create_confirmed_of(state: &AppState, grant: &OperatorGrant, amount: u64) -> i64 {
        let created = state
            .lifecycle_service
            .create_commitment(
                grant,
                "uuid-germany",
                "uuid-berlin",
                CreateCommitmentCommand {
                    service_type: "shared".into(),
                    resource_name: "things".into(),
                    availability_zone: "az-one".into(),
                    amount,
                    duration: "1 hour".parse().unwrap(),
                    confirm_by: None,
                    notify_on_confirm: false,
                },
            )
            .await
            .expect("creation must be accepted");

        let connection = state.database_client.get_connection().expect("connection");
        CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("row")
            .id
    }

    /// Start-transfer parcial (4 de 10) y aceptación con
    /// token: ambos deltas viajan en UNA petición y el movimiento es
    /// atómico.
    #[tokio::test]
    async fn certify_partial_transfer_and_atomic_accept() {
        let (state, grant) = assemble_proving_grounds("mem_transfer_partial").await;
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        state.time_authority.freeze_at(now);

        let original_id = create_confirmed_of(&state, &grant, 10).await;

        let carved = state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                original_id,
                StartTransferCommand {
                    amount: 4,
                    transfer_status: TransferStatus::Unlisted,
                },
            )
            .await
            .expect("partial start-transfer");

        assert_eq!(carved.amount, 4);
        assert_eq!(carved.transfer_status, TransferStatus::Unlisted);
        let transfer_token = carved.transfer_token.clone().expect("token present");

        // El ledger contiene: original superseded + hermanas 4 y 6.
        let connection = state.database_client.get_connection().expect("connection");
        let berlin_rows = CommitmentStore::list_for_project(&connection, 1).await.expect("list");
        let mut confirmed_amounts: Vec<u64> =
            berlin_rows.iter().map(|row| row.amount).collect();
        confirmed_amounts.sort_unstable();
        assert_eq!(confirmed_amounts, vec![4, 6]);

        let carved_row = CommitmentStore::find_by_uuid(&connection, &carved.uuid)
            .await
            .expect("carved row");

        // Aceptación desde dresden: origen baja 4, destino sube 4.
        let moved = state
            .lifecycle_service
            .accept_transfer(
                &grant,
                "uuid-germany",
                "uuid-dresden",
                carved_row.id,
                &transfer_token,
            )
            .await
            .expect("transfer accept");
        assert_eq!(moved.amount, 4);
        assert_eq!(moved.transfer_status, TransferStatus::None);

        // Ambos lados del movimiento viajaron en la misma petición.
        let conduit = state.liquid_gateway.scripted_conduit("shared").expect("scripted");
        let recorded = conduit.as_scripted().expect("scripted").recorded_requests();
        let move_request = recorded.last().expect("move request");
        assert_eq!(move_request.by_project.len(), 2);
        assert_eq!(
            move_request.by_project["uuid-berlin"].by_resource["things"].total_confirmed_after,
            6
        );
        assert_eq!(
            move_request.by_project["uuid-dresden"].by_resource["things"].total_confirmed_after,
            4
        );

        // Totales por (proyecto, AZResource) tras el movimiento.
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 1, carved_row.az_resource_id)
                .await
                .expect("sum berlin"),
            6
        );
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 2, carved_row.az_resource_id)
                .await
                .expect("sum dresden"),
            4
        );

        // El token se consumió con la aceptación.
        match CommitmentStore::find_by_transfer_token(&connection, &transfer_token).await {
            Err(DbError::TransferTokenNotFound) => {}
            other => panic!("token must be cleared, got {:?}", other.map(|row| row.uuid)),
        }
    }

    /// Tokens pairwise distintos entre compromisos en transferencia.
    #[tokio::test]
    async fn certify_token_uniqueness_across_offers() {
        let (state, grant) = assemble_proving_grounds("mem_transfer_tokens").await;
        state
            .time_authority
            .freeze_at(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());

        let first_id = create_confirmed_of(&state, &grant, 5).await;
        let second_id = create_confirmed_of(&state, &grant, 8).await;

        let first_offer = state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                first_id,
                StartTransferCommand { amount: 5, transfer_status: TransferStatus::Public },
            )
            .await
            .expect("first offer");
        let second_offer = state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                second_id,
                StartTransferCommand { amount: 8, transfer_status: TransferStatus::Unlisted },
            )
            .await
            .expect("second offer");

        let first_token = first_offer.transfer_token.expect("token");
        let second_token = second_offer.transfer_token.expect("token");
        assert_ne!(first_token, second_token);

        // Abandonar la transferencia limpia el token.
        let withdrawn = state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                first_id,
                StartTransferCommand { amount: 5, transfer_status: TransferStatus::None },
            )
            .await
            .expect("withdraw offer");
        assert_eq!(withdrawn.transfer_status, TransferStatus::None);
        assert_eq!(withdrawn.transfer_token, None);
    }

    /// Caché transferible: una creación inmediata que cabe en una
    /// oferta pública la consume: la oferta se supersede, renace bajo el
    /// reclamante y el proyecto origen recibe correo y auditoría.
    #[tokio::test]
    async fn certify_public_offer_consumption_on_create() {
        let (state, grant) = assemble_proving_grounds("mem_transfer_consume").await;
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        state.time_authority.freeze_at(now);

        // berlin publica una oferta de 5.
        let offered_id = create_confirmed_of(&state, &grant, 5).await;
        state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                offered_id,
                StartTransferCommand { amount: 5, transfer_status: TransferStatus::Public },
            )
            .await
            .expect("publish offer");

        let events_before = state.audit_repository.count_events().await.expect("count");

        // dresden pide exactamente 5: el camino de consumo se activa.
        let claimed = state
            .lifecycle_service
            .create_commitment(
                &grant,
                "uuid-germany",
                "uuid-dresden",
                CreateCommitmentCommand {
                    service_type: "shared".into(),
                    resource_name: "things".into(),
                    availability_zone: "az-one".into(),
                    amount: 5,
                    duration: "1 hour".parse().unwrap(),
                    confirm_by: None,
                    notify_on_confirm: false,
                },
            )
            .await
            .expect("claiming creation");
        assert_eq!(claimed.status, CommitmentStatus::Confirmed);
        assert_eq!(claimed.amount, 5);

        let connection = state.database_client.get_connection().expect("connection");

        // La oferta original quedó superseded y sin token.
        let consumed_offer = CommitmentStore::find_by_id_in_project(&connection, offered_id, 1)
            .await
            .expect("offer row");
        assert_eq!(consumed_offer.status, CommitmentStatus::Superseded);
        assert_eq!(consumed_offer.transfer_token, None);

        // Totales tras el consumo: berlin 0, dresden 5.
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 1, consumed_offer.az_resource_id)
                .await
                .expect("sum berlin"),
            0
        );
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 2, consumed_offer.az_resource_id)
                .await
                .expect("sum dresden"),
            5
        );

        // La petición única transporta ambos proyectos y ambos totales.
        let conduit = state.liquid_gateway.scripted_conduit("shared").expect("scripted");
        let recorded = conduit.as_scripted().expect("scripted").recorded_requests();
        let claim_request = recorded.last().expect("claim request");
        assert_eq!(claim_request.by_project.len(), 2);
        assert_eq!(
            claim_request.by_project["uuid-berlin"].by_resource["things"].total_confirmed_after,
            0
        );
        assert_eq!(
            claim_request.by_project["uuid-dresden"].by_resource["things"].total_confirmed_after,
            5
        );

        // Un evento por proyecto tocado; correo encolado para berlin.
        assert_eq!(
            state.audit_repository.count_events().await.expect("count"),
            events_before + 2
        );
        let unsent_mail =
            custos_infra_db::repositories::MailQueueRepository::list_unsent(&connection)
                .await
                .expect("mail queue");
        assert_eq!(unsent_mail.len(), 1);
        assert_eq!(unsent_mail[0].project_id, 1);
    }

    /// Las guardias de start-transfer: estado vigente y cotas de cantidad.
    #[tokio::test]
    async fn certify_start_transfer_guards() {
        let (state, grant) = assemble_proving_grounds("mem_transfer_guards").await;
        state
            .time_authority
            .freeze_at(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());

        let commitment_id = create_confirmed_of(&state, &grant, 5).await;

        // Cantidad por encima del compromiso.
        match state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                commitment_id,
                StartTransferCommand { amount: 9, transfer_status: TransferStatus::Public },
            )
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("transfer amount exceeds commitment amount"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        // Repetir el estado vigente es conflicto.
        match state
            .lifecycle_service
            .start_transfer(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                commitment_id,
                StartTransferCommand { amount: 5, transfer_status: TransferStatus::None },
            )
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("already in transfer status"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        // Un token desconocido en la aceptación es 404.
        match state
            .lifecycle_service
            .accept_transfer(
                &grant,
                "uuid-germany",
                "uuid-dresden",
                commitment_id,
                "token-that-never-existed",
            )
            .await
        {
            Err(LifecycleError::Db(DbError::TransferTokenNotFound)) => {}
            other => panic!("expected token miss, got {:?}", other.map(|_| ())),
        }
    }
}
