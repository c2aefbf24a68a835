// [tests/mirror/libs/infra/db/commitment_store.test.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT STORE CERTIFIER (V3.2 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: PARIDAD DE MAPEO, TOTALES Y FILTRADO DE HISTORIA
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    use custos_domain_models::commitment::{
        CommitmentReason, CommitmentStatus, CommitmentWorkflowContext, ProjectCommitment,
        TransferStatus,
    };
    use custos_domain_models::resource::{ResourceInfo, ResourceTopology, ServiceInfo};
    use custos_infra_db::repositories::commitment::generate_transfer_token;
    use custos_infra_db::repositories::{
        CatalogRepository, CommitmentStore, TenancyRepository,
    };
    use custos_infra_db::LedgerClient;

    /// Siembra un cluster mínimo y devuelve (cliente, project_id, az_resource_id).
    async fn seed_minimal_cluster(db_label: &str) -> (LedgerClient, i64, i64) {
        let database_client = LedgerClient::connect(
            &format!("file:{}?mode=memory&cache=shared", db_label),
            None,
        )
        .await
        .expect("in-memory ledger must anchor");

        let tenancy = TenancyRepository::new(database_client.clone());
        let domain = tenancy.ensure_domain("d-uuid", "germany").await.expect("domain");
        let project = tenancy
            .ensure_project(domain.id, "p-uuid", "berlin")
            .await
            .expect("project");

        let mut resources = BTreeMap::new();
        resources.insert(
            "things".to_string(),
            ResourceInfo {
                unit: Default::default(),
                topology: ResourceTopology::AzAware,
                has_quota: true,
            },
        );
        let service_info = ServiceInfo { version: 1, resources, rates: Vec::new() };

        let catalog = CatalogRepository::new(database_client.clone());
        catalog
            .synchronize_service("shared", &service_info, &["az-one".into(), "az-two".into()])
            .await
            .expect("catalog sync");

        let connection = database_client.get_connection().expect("connection");
        let resource = CatalogRepository::find_resource(&connection, "shared", "things")
            .await
            .expect("resource");
        let az_resource = CatalogRepository::find_az_resource(&connection, resource.id, "az-one")
            .await
            .expect("az resource");

        (database_client, project.id, az_resource.id)
    }

    fn sample_commitment(project_id: i64, az_resource_id: i64, amount: u64) -> ProjectCommitment {
        let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        ProjectCommitment {
            id: 0,
            uuid: uuid::Uuid::new_v4().to_string(),
            project_id,
            az_resource_id,
            amount,
            duration: "1 hour".parse().unwrap(),
            created_at: base,
            creator_uuid: "creator-uuid".into(),
            creator_name: "creator@cloud".into(),
            confirm_by: None,
            confirmed_at: Some(base),
            expires_at: base + chrono::Duration::hours(1),
            superseded_at: None,
            status: CommitmentStatus::Confirmed,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            transfer_started_at: None,
            notify_on_confirm: false,
            notified_for_expiration: false,
            creation_context: CommitmentWorkflowContext::new(CommitmentReason::Create),
            supersede_context: None,
            renew_context: None,
        }
    }

    /// Inserción y recuperación bit-perfecta de una fila del ledger.
    #[tokio::test]
    async fn certify_insert_and_map_roundtrip() {
        let (database_client, project_id, az_resource_id) =
            seed_minimal_cluster("mem_store_roundtrip").await;
        let connection = database_client.get_connection().expect("connection");

        let mut original = sample_commitment(project_id, az_resource_id, 5);
        let row_id = CommitmentStore::insert(&connection, &original)
            .await
            .expect("insert");
        original.id = row_id;

        let recovered = CommitmentStore::find_by_uuid(&connection, &original.uuid)
            .await
            .expect("find by uuid");
        assert_eq!(recovered, original, "ledger roundtrip must be lossless");
    }

    /// El total confirmado suma solo filas Confirmed.
    #[tokio::test]
    async fn certify_confirmed_total_ignores_history() {
        let (database_client, project_id, az_resource_id) =
            seed_minimal_cluster("mem_store_totals").await;
        let connection = database_client.get_connection().expect("connection");

        let confirmed = sample_commitment(project_id, az_resource_id, 5);
        let confirmed_id = CommitmentStore::insert(&connection, &confirmed).await.expect("insert");

        let mut planned = sample_commitment(project_id, az_resource_id, 7);
        planned.status = CommitmentStatus::Planned;
        planned.confirmed_at = None;
        CommitmentStore::insert(&connection, &planned).await.expect("insert planned");

        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, project_id, az_resource_id)
                .await
                .expect("sum"),
            5
        );

        // La supersesión retira la fila del total y del listado.
        CommitmentStore::mark_superseded(
            &connection,
            confirmed_id,
            &CommitmentWorkflowContext::new(CommitmentReason::Merge),
            Utc.with_ymd_and_hms(2026, 8, 1, 13, 0, 0).unwrap(),
        )
        .await
        .expect("supersede");

        assert_eq!(
            CommitmentStore::sum_confirmed(&connection, project_id, az_resource_id)
                .await
                .expect("sum after supersede"),
            0
        );

        let listed = CommitmentStore::list_for_project(&connection, project_id)
            .await
            .expect("list");
        assert_eq!(listed.len(), 1, "superseded history is filtered by default");
        assert_eq!(listed[0].status, CommitmentStatus::Planned);
    }

    /// Una fila superseded conserva contexto y marca temporal.
    #[tokio::test]
    async fn certify_supersede_records_context() {
        let (database_client, project_id, az_resource_id) =
            seed_minimal_cluster("mem_store_supersede").await;
        let connection = database_client.get_connection().expect("connection");

        let commitment = sample_commitment(project_id, az_resource_id, 9);
        let row_id = CommitmentStore::insert(&connection, &commitment).await.expect("insert");

        let supersede_context = CommitmentWorkflowContext::with_related(
            CommitmentReason::Split,
            &[(41, "sibling-a"), (42, "sibling-b")],
        );
        let superseded_at = Utc.with_ymd_and_hms(2026, 8, 1, 14, 0, 0).unwrap();
        CommitmentStore::mark_superseded(&connection, row_id, &supersede_context, superseded_at)
            .await
            .expect("supersede");

        let recovered = CommitmentStore::find_by_uuid(&connection, &commitment.uuid)
            .await
            .expect("find");
        assert_eq!(recovered.status, CommitmentStatus::Superseded);
        assert_eq!(recovered.superseded_at, Some(superseded_at));
        assert_eq!(recovered.supersede_context, Some(supersede_context));
    }

    /// Los tokens generados son opacos, largos y pairwise distintos.
    #[test]
    fn certify_generated_tokens_are_distinct() {
        let mut seen_tokens = std::collections::HashSet::new();
        for _ in 0..256 {
            let token = generate_transfer_token();
            assert_eq!(token.len(), 48);
            assert!(seen_tokens.insert(token), "token collision detected");
        }
    }
}
