// [tests/mirror/libs/infra/db/schema_bootstrap.test.rs]
/*!
 * =================================================================
 * APARATO: SCHEMA BOOTSTRAP CERTIFIER (V3.1 - TRINITY EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: IDEMPOTENCIA DEL ESQUEMA Y UNICIDAD DEL TOKEN
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use custos_infra_db::schema::apply_full_ledger_schema;
    use custos_infra_db::LedgerClient;
    use libsql::params;

    /// El bootstrap del esquema es idempotente: una segunda pasada sobre
    /// la misma base no puede fallar ni perder datos.
    #[tokio::test]
    async fn certify_schema_bootstrap_is_idempotent() {
        let database_client =
            LedgerClient::connect("file:mem_schema_idem?mode=memory&cache=shared", None)
                .await
                .expect("in-memory ledger must anchor");

        let connection = database_client.get_connection().expect("connection");
        connection
            .execute(
                "INSERT INTO domains (uuid, name) VALUES ('d-uuid', 'germany')",
                (),
            )
            .await
            .expect("seed insert");

        // Segunda pasada en caliente.
        apply_full_ledger_schema(&connection)
            .await
            .expect("second schema pass must be clean");

        let mut rows = connection
            .query("SELECT COUNT(*) FROM domains", ())
            .await
            .expect("count query");
        let row = rows.next().await.expect("row fetch").expect("one row");
        let count: i64 = row.get(0).expect("count value");
        assert_eq!(count, 1, "re-running the schema must not wipe data");
    }

    /// Las tablas nucleares del ledger existen tras el bootstrap.
    #[tokio::test]
    async fn certify_core_tables_exist() {
        let database_client =
            LedgerClient::connect("file:mem_schema_tables?mode=memory&cache=shared", None)
                .await
                .expect("in-memory ledger must anchor");
        let connection = database_client.get_connection().expect("connection");

        for table_name in [
            "domains",
            "projects",
            "services",
            "resources",
            "az_resources",
            "project_resources",
            "project_az_resources",
            "project_commitments",
            "project_rates",
            "audit_events",
            "mail_queue",
        ] {
            let mut rows = connection
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table_name],
                )
                .await
                .expect("catalog query");
            let row = rows.next().await.expect("row fetch").expect("one row");
            let present: i64 = row.get(0).expect("presence value");
            assert_eq!(present, 1, "table {} must exist", table_name);
        }
    }

    /// El índice UNIQUE del token rechaza duplicados en el motor.
    #[tokio::test]
    async fn certify_transfer_token_uniqueness_is_engine_enforced() {
        let database_client =
            LedgerClient::connect("file:mem_schema_token?mode=memory&cache=shared", None)
                .await
                .expect("in-memory ledger must anchor");
        let connection = database_client.get_connection().expect("connection");

        connection
            .execute("INSERT INTO domains (uuid, name) VALUES ('d', 'germany')", ())
            .await
            .expect("domain");
        connection
            .execute(
                "INSERT INTO projects (uuid, name, domain_id) VALUES ('p', 'berlin', 1)",
                (),
            )
            .await
            .expect("project");

        let insert_with_token = "
            INSERT INTO project_commitments (
                uuid, project_id, az_resource_id, amount, duration, created_at,
                creator_uuid, creator_name, expires_at, status, transfer_status,
                transfer_token, creation_context_json
            ) VALUES (?1, 1, 1, 5, '1 hour', '2026-08-01T00:00:00.000000Z',
                'c', 'c@cloud', '2026-08-01T01:00:00.000000Z', 'confirmed', 'public',
                ?2, '{\"reason\":\"create\"}')
        ";

        connection
            .execute(insert_with_token, params!["row-one", "token-alpha"])
            .await
            .expect("first token holder");

        let duplicate_outcome = connection
            .execute(insert_with_token, params!["row-two", "token-alpha"])
            .await;
        assert!(
            duplicate_outcome.is_err(),
            "a duplicate transfer token must be refused by the unique index"
        );
    }
}
