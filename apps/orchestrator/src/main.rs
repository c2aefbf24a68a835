// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V3.2 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 * =================================================================
 */

use std::path::PathBuf;

use custos_orchestrator::prelude::*;

use custos_shared_vigil::init_tracing;
use dotenvy::dotenv;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Hidratación de variables de entorno del proceso.
    dotenv().ok();

    init_tracing("custos_orchestrator");

    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️ [COMMAND_CENTER]: Global ignition sequence starting...");

        let database_connection_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");
        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let cluster_config_path: PathBuf = std::env::var("CLUSTER_CONFIG_PATH")
            .unwrap_or_else(|_| "cluster-config.json".to_string())
            .into();

        let auth_tokens_specification = std::env::var("AUTH_TOKENS").unwrap_or_default();

        let listening_network_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let kernel = match OrchestratorKernel::ignite(
            &database_connection_url,
            database_access_token,
            &cluster_config_path,
            &auth_tokens_specification,
            listening_network_port,
        )
        .await
        {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("💀 [KERNEL_FAULT]: Ignition aborted: {:#}", ignition_fault);
                std::process::exit(1);
            }
        };

        if let Err(serve_fault) = kernel.serve().await {
            error!("💀 [KERNEL_FAULT]: Server collapsed: {:#}", serve_fault);
            std::process::exit(1);
        }
    });

    Ok(())
}
