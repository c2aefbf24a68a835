// [tests/mirror/apps/orchestrator/routes/commitment_api.test.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT API CERTIFIER (V3.2 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: DESPACHO DE RUTAS, CÓDIGOS DE ESTADO Y LECTURA
 *                  IDEMPOTENTE
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    use custos_domain_models::config::ClusterConfig;
    use custos_domain_models::resource::{ResourceInfo, ResourceTopology, ServiceInfo};
    use custos_infra_db::LedgerClient;
    use custos_infra_liquid::{LiquidConduit, LiquidGateway, ScriptedConduit};
    use custos_orchestrator::bootstrap::synchronize_cluster;
    use custos_orchestrator::middleware::GrantRegistry;
    use custos_orchestrator::routes::create_router;
    use custos_orchestrator::services::chronos::TimeAuthority;
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
            "availability_zones": ["az-one"],
            "services": [{
                "service_type": "shared",
                "resources": [
                    { "name": "things", "commitment": {
                        "permitted_durations": ["1 hour"]
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

    async fn assemble_router(db_label: &str) -> axum::Router {
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

        let time_authority = Arc::new(TimeAuthority::system());
        time_authority.freeze_at(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());

        let state = AppState::assemble(
            database_client,
            cluster_config,
            liquid_gateway,
            Arc::new(GrantRegistry::from_specification(
                "secret=project:show,project:edit,cluster:show_basic,cluster:edit;\
                 viewer=cluster:show_basic",
            )),
            time_authority,
        );
        create_router(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&raw).expect("json body")
    }

    /// Sin bearer token la superficie /v1 es 401; /health queda abierta.
    #[tokio::test]
    async fn certify_perimeter_guard() {
        let router = assemble_router("mem_api_perimeter").await;

        let unauthenticated = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/domains/uuid-germany/projects/uuid-berlin/commitments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    /// La superficie HTTP de creación: POST /commitments/new es
    /// 201 con forma de presentación completa; el GET posterior es una
    /// función pura del estado persistido.
    #[tokio::test]
    async fn certify_create_and_idempotent_listing() {
        let router = assemble_router("mem_api_create_list").await;

        let creation_payload = serde_json::json!({
            "service_type": "shared",
            "resource_name": "things",
            "availability_zone": "az-one",
            "amount": 5,
            "duration": "1 hour"
        })
        .to_string();

        let creation_response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/domains/uuid-germany/projects/uuid-berlin/commitments/new")
                    .header("Authorization", "Bearer secret")
                    .header("content-type", "application/json")
                    .body(Body::from(creation_payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(creation_response.status(), StatusCode::CREATED);

        let created = body_json(creation_response).await;
        assert_eq!(created["commitment"]["status"], "confirmed");
        assert_eq!(created["commitment"]["amount"], 5);
        assert_eq!(created["commitment"]["service_type"], "shared");

        // Dos lecturas consecutivas devuelven el mismo cuerpo.
        let mut listing_bodies = Vec::new();
        for _ in 0..2 {
            let listing_response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/v1/domains/uuid-germany/projects/uuid-berlin/commitments")
                        .header("Authorization", "Bearer secret")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(listing_response.status(), StatusCode::OK);
            listing_bodies.push(body_json(listing_response).await);
        }
        assert_eq!(listing_bodies[0], listing_bodies[1]);
        assert_eq!(listing_bodies[0]["commitments"].as_array().unwrap().len(), 1);
    }

    /// La política de alcances responde 403 ante un grant insuficiente y
    /// 404 ante objetivos de ruta inexistentes.
    #[tokio::test]
    async fn certify_scope_and_route_target_faults() {
        let router = assemble_router("mem_api_faults").await;

        // 'viewer' carece de project:show.
        let forbidden = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/domains/uuid-germany/projects/uuid-berlin/commitments")
                    .header("Authorization", "Bearer viewer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        // Proyecto desconocido bajo dominio válido.
        let missing_project = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/domains/uuid-germany/projects/uuid-ghost/commitments")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing_project.status(), StatusCode::NOT_FOUND);

        // Token de transferencia inexistente.
        let missing_token = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/commitments/token-that-never-existed")
                    .header("Authorization", "Bearer viewer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing_token.status(), StatusCode::NOT_FOUND);

        // Aceptación sin cabecera Transfer-Token es 400.
        let missing_header = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/domains/uuid-germany/projects/uuid-berlin/transfer-commitment/1")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing_header.status(), StatusCode::BAD_REQUEST);
    }
}
