// [tests/mirror/apps/orchestrator/services/commitment_creation.test.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT CREATION CERTIFIER (V3.3 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: CAMINO INMEDIATO, CAMINO PLANNED Y VALIDACIONES
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
    use custos_infra_db::repositories::{CatalogRepository, CommitmentStore};
    use custos_infra_db::LedgerClient;
    use custos_infra_liquid::{LiquidConduit, LiquidGateway, ScriptedConduit};
    use custos_orchestrator::bootstrap::synchronize_cluster;
    use custos_orchestrator::errors::LifecycleError;
    use custos_orchestrator::middleware::{GrantRegistry, OperatorGrant};
    use custos_orchestrator::services::chronos::TimeAuthority;
    use custos_orchestrator::services::lifecycle::creation::CreateCommitmentCommand;
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
        resources.insert(
            "baselines".to_string(),
            ResourceInfo {
                unit: Default::default(),
                topology: ResourceTopology::Flat,
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
                        "permitted_durations": ["1 hour", "1 day", "2 days", "1 year"]
                    }},
                    { "name": "baselines", "commitment": {
                        "permitted_durations": ["1 hour"]
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

    fn frozen_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn immediate_command(amount: u64) -> CreateCommitmentCommand {
        CreateCommitmentCommand {
            service_type: "shared".into(),
            resource_name: "things".into(),
            availability_zone: "az-one".into(),
            amount,
            duration: "1 hour".parse().unwrap(),
            confirm_by: None,
            notify_on_confirm: false,
        }
    }

    /// Creación con confirmación inmediata aceptada:
    /// fila Confirmed, auditoría emitida y rescrape señalizado.
    #[tokio::test]
    async fn certify_immediate_confirm_accepted() {
        let (state, grant) = assemble_proving_grounds("mem_create_immediate").await;
        let now = frozen_instant();
        state.time_authority.freeze_at(now);

        let mut event_receiver = state.event_bus.subscribe();

        let created = state
            .lifecycle_service
            .create_commitment(&grant, "uuid-germany", "uuid-berlin", immediate_command(5))
            .await
            .expect("creation must be accepted");

        assert_eq!(created.status, CommitmentStatus::Confirmed);
        assert_eq!(created.confirmed_at, Some(now));
        assert_eq!(created.expires_at, now + TimeDelta::hours(1));
        assert_eq!(created.amount, 5);

        // La fila quedó sellada en el ledger.
        let connection = state.database_client.get_connection().expect("connection");
        let stored = CommitmentStore::find_by_uuid(&connection, &created.uuid)
            .await
            .expect("stored row");
        assert_eq!(stored.status, CommitmentStatus::Confirmed);

        // Totales before/after correctos en el diálogo de aceptación.
        let conduit = state.liquid_gateway.scripted_conduit("shared").expect("scripted");
        let recorded = conduit.as_scripted().expect("scripted").recorded_requests();
        let last_request = recorded.last().expect("one request");
        let changeset = &last_request.by_project["uuid-berlin"].by_resource["things"];
        assert_eq!(changeset.total_confirmed_before, 0);
        assert_eq!(changeset.total_confirmed_after, 5);

        // Evento de auditoría persistido y señal de rescrape difundida.
        assert_eq!(state.audit_repository.count_events().await.expect("count"), 1);
        let service = CatalogRepository::find_service(&connection, "shared")
            .await
            .expect("service row");
        assert_eq!(service.rescrape_requested_at, Some(now));
        assert!(event_receiver.try_recv().is_ok(), "post-commit signals must flow");
    }

    /// Creación Planned: el backend solo es informado y la fila nace
    /// Planned con vencimiento anclado en confirm_by.
    #[tokio::test]
    async fn certify_planned_creation() {
        let (state, grant) = assemble_proving_grounds("mem_create_planned").await;
        let now = frozen_instant();
        state.time_authority.freeze_at(now);

        let confirm_by = now + TimeDelta::days(1);
        let mut command = immediate_command(5);
        command.confirm_by = Some(confirm_by);
        command.notify_on_confirm = true;

        let created = state
            .lifecycle_service
            .create_commitment(&grant, "uuid-germany", "uuid-berlin", command)
            .await
            .expect("planned creation");

        assert_eq!(created.status, CommitmentStatus::Planned);
        assert_eq!(created.confirm_by, Some(confirm_by));
        assert_eq!(created.expires_at, confirm_by + TimeDelta::hours(1));
        assert_eq!(created.notify_on_confirm, Some(true));

        // La petición informativa no exige confirmación.
        let conduit = state.liquid_gateway.scripted_conduit("shared").expect("scripted");
        let recorded = conduit.as_scripted().expect("scripted").recorded_requests();
        assert!(!recorded.last().expect("request").requires_confirmation());
    }

    /// Catálogo de validaciones semánticas (422) de la creación.
    #[tokio::test]
    async fn certify_creation_validation_catalog() {
        let (state, grant) = assemble_proving_grounds("mem_create_validation").await;
        let now = frozen_instant();
        state.time_authority.freeze_at(now);

        let validation_cases: Vec<(CreateCommitmentCommand, &str)> = vec![
            (
                CreateCommitmentCommand { amount: 0, ..immediate_command(0) },
                "amount must be positive",
            ),
            (
                CreateCommitmentCommand {
                    duration: "3 hours".parse().unwrap(),
                    ..immediate_command(5)
                },
                "unacceptable commitment duration",
            ),
            (
                CreateCommitmentCommand {
                    resource_name: "gizmos".into(),
                    ..immediate_command(5)
                },
                "no such service and/or resource: shared/gizmos",
            ),
            (
                CreateCommitmentCommand {
                    availability_zone: "az-nine".into(),
                    ..immediate_command(5)
                },
                "no such availability zone: az-nine",
            ),
            (
                CreateCommitmentCommand {
                    resource_name: "baselines".into(),
                    availability_zone: "az-one".into(),
                    ..immediate_command(5)
                },
                "resource does not accept AZ-aware commitments",
            ),
            (
                CreateCommitmentCommand {
                    confirm_by: Some(now - TimeDelta::hours(1)),
                    ..immediate_command(5)
                },
                "confirm_by must not be in the past",
            ),
            (
                CreateCommitmentCommand {
                    notify_on_confirm: true,
                    ..immediate_command(5)
                },
                "notify_on_confirm requires a confirm_by value",
            ),
        ];

        for (command, expected_message) in validation_cases {
            match state
                .lifecycle_service
                .create_commitment(&grant, "uuid-germany", "uuid-berlin", command)
                .await
            {
                Err(LifecycleError::Validation(message)) => {
                    assert_eq!(message, expected_message);
                }
                other => panic!("expected validation refusal, got {:?}", other.map(|_| ())),
            }
        }

        // Ningún caso inválido dejó rastro en el ledger.
        let connection = state.database_client.get_connection().expect("connection");
        let project = custos_infra_db::repositories::TenancyRepository::find_project_in_domain(
            &connection,
            1,
            "uuid-berlin",
        )
        .await
        .expect("project");
        assert!(CommitmentStore::list_for_project(&connection, project.id)
            .await
            .expect("list")
            .is_empty());
    }
}
