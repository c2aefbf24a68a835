// [tests/mirror/apps/orchestrator/services/conversion_flow.test.rs]
/*!
 * =================================================================
 * APARATO: CONVERSION FLOW CERTIFIER (V3.3 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: CONVERSIÓN CON REMANENTE, DIVISIBILIDAD Y LISTADO
 *                  DE DESTINOS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
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
    use custos_orchestrator::services::lifecycle::conversion::ConvertCommitmentCommand;
    use custos_orchestrator::services::lifecycle::creation::CreateCommitmentCommand;
    use custos_orchestrator::state::AppState;

    fn declared_service_info() -> ServiceInfo {
        let mut resources = BTreeMap::new();
        for resource_name in ["things", "gadgets"] {
            resources.insert(
                resource_name.to_string(),
                ResourceInfo {
                    unit: Default::default(),
                    topology: ResourceTopology::AzAware,
                    has_quota: true,
                },
            );
        }
        ServiceInfo { version: 1, resources, rates: Vec::new() }
    }

    /// Pesos 3 (things) y 2 (gadgets): tasa things->gadgets from=2,to=3.
    fn proving_cluster_config() -> ClusterConfig {
        serde_json::from_value(serde_json::json!({
            "availability_zones": ["az-one", "az-two"],
            "services": [{
                "service_type": "shared",
                "resources": [
                    { "name": "things", "commitment": {
                        "permitted_durations": ["1 hour", "1 day"],
                        "conversion": { "identifier": "baseunits", "weight": 3 }
                    }},
                    { "name": "gadgets", "commitment": {
                        "permitted_durations": ["1 hour", "1 day"],
                        "conversion": { "identifier": "baseunits", "weight": 2 }
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

    async fn create_confirmed_things(state: &AppState, grant: &OperatorGrant, amount: u64) -> i64 {
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

    /// Conversión con remanente: 6 de 7 things rinden 9
    /// gadgets; el remanente de 1 queda Confirmed en el origen.
    #[tokio::test]
    async fn certify_conversion_with_remainder() {
        let (state, grant) = assemble_proving_grounds("mem_convert_remainder").await;
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        state.time_authority.freeze_at(now);

        let source_id = create_confirmed_things(&state, &grant, 7).await;

        let converted = state
            .lifecycle_service
            .convert_commitment(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                source_id,
                ConvertCommitmentCommand {
                    target_service_type: "shared".into(),
                    target_resource_name: "gadgets".into(),
                    source_amount: 6,
                    target_amount: 9,
                },
            )
            .await
            .expect("conversion must succeed");

        assert_eq!(converted.amount, 9);
        assert_eq!(converted.resource_name, "gadgets");
        assert_eq!(converted.status, CommitmentStatus::Confirmed);

        let connection = state.database_client.get_connection().expect("connection");

        // La suma se preserva a través de la tasa: 1 thing + 9
        // gadgets (= 6 things) en unidades base.
        let things_resource = CatalogRepository::find_resource(&connection, "shared", "things")
            .await
            .expect("things");
        let gadgets_resource = CatalogRepository::find_resource(&connection, "shared", "gadgets")
            .await
            .expect("gadgets");
        let things_az =
            CatalogRepository::find_az_resource(&connection, things_resource.id, "az-one")
                .await
                .expect("things az");
        let gadgets_az =
            CatalogRepository::find_az_resource(&connection, gadgets_resource.id, "az-one")
                .await
                .expect("gadgets az");

        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 1, things_az.id)
                .await
                .expect("things sum"),
            1
        );
        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, 1, gadgets_az.id)
                .await
                .expect("gadgets sum"),
            9
        );

        // El original quedó superseded con razón de conversión.
        let original = CommitmentStore::find_by_id_in_project(&connection, source_id, 1)
            .await
            .expect("original");
        assert_eq!(original.status, CommitmentStatus::Superseded);
        let supersede_context = original.supersede_context.expect("context");
        assert_eq!(supersede_context.related_commitment_uuids.len(), 2);

        // El diálogo de aceptación tocó ambos recursos.
        let conduit = state.liquid_gateway.scripted_conduit("shared").expect("scripted");
        let recorded = conduit.as_scripted().expect("scripted").recorded_requests();
        let conversion_request = recorded.last().expect("request");
        let by_resource = &conversion_request.by_project["uuid-berlin"].by_resource;
        assert_eq!(by_resource["things"].total_confirmed_after, 1);
        assert_eq!(by_resource["gadgets"].total_confirmed_after, 9);
    }

    /// source_amount=7 con tasa from=2 es indivisible: conflicto 409.
    #[tokio::test]
    async fn certify_indivisible_amount_is_conflict() {
        let (state, grant) = assemble_proving_grounds("mem_convert_indivisible").await;
        state
            .time_authority
            .freeze_at(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());

        let source_id = create_confirmed_things(&state, &grant, 7).await;

        match state
            .lifecycle_service
            .convert_commitment(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                source_id,
                ConvertCommitmentCommand {
                    target_service_type: "shared".into(),
                    target_resource_name: "gadgets".into(),
                    source_amount: 7,
                    target_amount: 10,
                },
            )
            .await
        {
            Err(LifecycleError::Conflict(message)) => {
                assert_eq!(message, "amount: 7 does not fit into conversion rate of: 2");
            }
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }
    }

    /// El listado de conversiones publica la tasa normalizada.
    #[tokio::test]
    async fn certify_conversion_listing() {
        let (state, grant) = assemble_proving_grounds("mem_convert_listing").await;

        let conversions = state
            .lifecycle_service
            .list_conversion_targets(&grant, "shared", "things")
            .await
            .expect("listing");

        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].target_resource_name, "gadgets");
        assert_eq!(conversions[0].from, 2);
        assert_eq!(conversions[0].to, 3);

        // Un objetivo de cantidad que no casa con la tasa es 422.
        let (state, grant) = assemble_proving_grounds("mem_convert_mismatch").await;
        state
            .time_authority
            .freeze_at(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());
        let source_id = create_confirmed_things(&state, &grant, 8).await;

        match state
            .lifecycle_service
            .convert_commitment(
                &grant,
                "uuid-germany",
                "uuid-berlin",
                source_id,
                ConvertCommitmentCommand {
                    target_service_type: "shared".into(),
                    target_resource_name: "gadgets".into(),
                    source_amount: 6,
                    target_amount: 8,
                },
            )
            .await
        {
            Err(LifecycleError::Validation(message)) => {
                assert!(message.contains("does not match the conversion rate (expected 9)"));
            }
            other => panic!("expected validation refusal, got {:?}", other.map(|_| ())),
        }
    }
}
