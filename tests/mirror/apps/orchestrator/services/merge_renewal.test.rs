// [tests/mirror/apps/orchestrator/services/merge_renewal.test.rs]
/*!
 * =================================================================
 * APARATO: MERGE & RENEWAL CERTIFIER (V3.3 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: FUSIÓN CON PRESERVACIÓN DE SUMA Y RENOVACIÓN
 *                  DENTRO DE VENTANA
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration as TimeDelta, TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use custos_domain_models::commitment::CommitmentStatus;
    use custos_domain_models::config::ClusterConfig;
    use custos_domain_models::resource::{ResourceInfo, ResourceTopology, ServiceInfo};
    use custos_infra_db::repositories::CommitmentStore;
    use custos_infra_db::LedgerClient;
    use custos_infra_liquid::{LiquidConduit, LiquidGateway, ScriptedConduit};
    use custos_orchestrator::bootstrap::synchronize_cluster;
    use custos_orchestrator::errors::LifecycleError;
    use custos_orchestrator::middleware::{GrantRegistry, OperatorGrant};
    use custos_orchestrator::services::chronos::{ChronosSweep, TimeAuthority};
    use custos_orchestrator::services::lifecycle::creation::CreateCommitmentCommand;
    use custos_orchestrator::services::lifecycle::merging::MergeCommitmentsCommand;
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
                        "permitted_durations": ["1 hour", "1 day", "1 year"]
                    }}
                ]
            }],
            "seed_domains": [{
                "name": "germany", "uuid": "uuid-germany",
                "projects": [{ "name": "berlin", "uuid": "uuid-berlin" }]
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

    fn frozen_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn sweep_for(state: &AppState) -> ChronosSweep {
        ChronosSweep::new(
            state.database_client.clone(),
            Arc::clone(&state.liquid_gateway),
            Arc::clone(&state.cluster_config),
            Arc::clone(&state.event_bus),
            Arc::clone(&state.time_authority),
        )
    }

    async fn create_confirmed(
        state: &AppState,
        grant: &OperatorGrant,
        amount: u64,
        duration: &str,
    ) -> (String, i64) {
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
                    duration: duration.parse().unwrap(),
                    confirm_by: None,
                    notify_on_confirm: false,
                },
            )
            .await
            .expect("creation must be accepted");

        let connection = state.database_client.get_connection().expect("connection");
        let row = CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("row");
        (created.uuid, row.id)
    }

    /// Fusión de dos confirmados: cantidad 10, vencimiento
    /// máximo, entradas superseded referenciando la fila nueva.
    #[tokio::test]
    async fn certify_merge_preserves_sum_and_latest_expiry() {
        let (state, grant) = assemble_proving_grounds("mem_merge_pair").await;
        let now = frozen_instant();
        state.time_authority.freeze_at(now);

        let (uuid_a, id_a) = create_confirmed(&state, &grant, 3, "1 hour").await;
        let (uuid_b, id_b) = create_confirmed(&state, &grant, 7, "1 day").await;

        let merged = state
            .lifecycle_service
            .merge_commitments(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                MergeCommitmentsCommand { commitment_ids: vec![id_a, id_b] },
            )
            .await
            .expect("merge must succeed");

        assert_eq!(merged.amount, 10);
        assert_eq!(merged.expires_at, now + TimeDelta::days(1));
        assert_eq!(merged.status, CommitmentStatus::Confirmed);

        let connection = state.database_client.get_connection().expect("connection");
        for input_uuid in [&uuid_a, &uuid_b] {
            let input_row = CommitmentStore::find_by_uuid(&connection, input_uuid)
                .await
                .expect("input row");
            assert_eq!(input_row.status, CommitmentStatus::Superseded);
            let context = input_row.supersede_context.expect("supersede context");
            assert_eq!(context.related_commitment_uuids, vec![merged.uuid.clone()]);
        }

        // El total confirmado no cambió con la fusión.
        let merged_row = CommitmentStore::find_by_uuid(&connection, &merged.uuid)
            .await
            .expect("merged row");
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, merged_row.project_id, merged_row.az_resource_id)
                .await
                .expect("sum"),
            10
        );
    }

    /// La fusión exige al menos dos compromisos distintos y estado
    /// Confirmed en todas las entradas.
    #[tokio::test]
    async fn certify_merge_guard_refusals() {
        let (state, grant) = assemble_proving_grounds("mem_merge_guards").await;
        state.time_authority.freeze_at(frozen_instant());

        let (_uuid, lone_id) = create_confirmed(&state, &grant, 3, "1 hour").await;

        match state
            .lifecycle_service
            .merge_commitments(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                MergeCommitmentsCommand { commitment_ids: vec![lone_id, lone_id] },
            )
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("at least two distinct commitments"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }
    }

    /// Planned, barrido de confirmación y renovación en
    /// ventana; la segunda renovación es conflicto "already renewed".
    #[tokio::test]
    async fn certify_renewal_window_lifecycle() {
        let (state, grant) = assemble_proving_grounds("mem_renewal_flow").await;
        let now = frozen_instant();
        state.time_authority.freeze_at(now);

        // Fila Planned con confirmación a un día vista y vida de un año.
        let confirm_by = now + TimeDelta::days(1);
        let created = state
            .lifecycle_service
            .create_commitment(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                CreateCommitmentCommand {
                    service_type: "shared".into(),
                    resource_name: "things".into(),
                    availability_zone: "az-one".into(),
                    amount: 5,
                    duration: "1 year".parse().unwrap(),
                    confirm_by: Some(confirm_by),
                    notify_on_confirm: false,
                },
            )
            .await
            .expect("planned creation");
        assert_eq!(created.status, CommitmentStatus::Planned);

        let connection = state.database_client.get_connection().expect("connection");
        let planned_row = CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("planned row");

        // Renovar antes de confirmar es conflicto de estado.
        match state
            .lifecycle_service
            .renew_commitment(&grant, "uuid-germany", "uuid-berlin", planned_row.id)
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("invalid status \"planned\""));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        // El reloj alcanza confirm_by: Planned -> Pending -> Confirmed.
        state.time_authority.freeze_at(confirm_by + TimeDelta::minutes(1));
        sweep_for(&state).run_sweep_cycle().await.expect("sweep");

        let confirmed_row = CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("confirmed row");
        assert_eq!(confirmed_row.status, CommitmentStatus::Confirmed);

        // Demasiado pronto para renovar (fuera de la ventana de 90 días).
        match state
            .lifecycle_service
            .renew_commitment(&grant, "uuid-germany", "uuid-berlin", confirmed_row.id)
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("renewal attempt is too early"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        // A 30 días del vencimiento la renovación procede.
        state
            .time_authority
            .freeze_at(confirmed_row.expires_at - TimeDelta::days(30));
        let renewal = state
            .lifecycle_service
            .renew_commitment(&grant, "uuid-germany", "uuid-berlin", confirmed_row.id)
            .await
            .expect("renewal inside the window");

        assert_eq!(renewal.status, CommitmentStatus::Planned);
        assert_eq!(renewal.confirm_by, Some(confirmed_row.expires_at));

        let original_after_renewal = CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("original row");
        let renew_context = original_after_renewal.renew_context.expect("renew context");
        assert_eq!(renew_context.related_commitment_uuids, vec![renewal.uuid.clone()]);

        // Una sola cadena de renovación activa.
        match state
            .lifecycle_service
            .renew_commitment(&grant, "uuid-germany", "uuid-berlin", confirmed_row.id)
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert!(message.contains("already renewed"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }
    }
}
