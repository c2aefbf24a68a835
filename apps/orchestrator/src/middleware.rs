// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER AUTHENTICATION GUARD (V3.1 - GRANT INJECTION)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: RESOLUCIÓN DE TOKENS A GRANTS E INYECCIÓN DE
 *                  IDENTIDAD EN EL FLUJO DE LA PETICIÓN
 *
 * La política real vive en el directorio de identidad, fuera del
 * núcleo; aquí los tokens se resuelven contra el mapa configurado
 * (AUTH_TOKENS = "token=scope,scope;token=...").
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::state::AppState;

/// Identidad y alcances del operador autenticado.
#[derive(Debug, Clone)]
pub struct OperatorGrant {
    pub operator_uuid: String,
    pub operator_name: String,
    pub scopes: HashSet<String>,
}

impl OperatorGrant {
    pub fn allows(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Grant de laboratorio con todos los alcances del núcleo.
    pub fn omnipotent_for_tests(operator_name: &str) -> Self {
        Self {
            operator_uuid: format!("uuid-of-{}", operator_name),
            operator_name: operator_name.to_string(),
            scopes: [
                "project:show",
                "project:edit",
                "cluster:show_basic",
                "cluster:edit",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// Mapa token -> grant cargado en el bootstrap.
#[derive(Debug, Default)]
pub struct GrantRegistry {
    grants_by_token: HashMap<String, OperatorGrant>,
}

impl GrantRegistry {
    /// Parsea la especificación 'token=scope,scope;token=...'. El nombre
    /// del operador se deriva del orden de registro.
    pub fn from_specification(raw_specification: &str) -> Self {
        let mut grants_by_token = HashMap::new();

        for (entry_index, entry) in raw_specification
            .split(';')
            .filter(|entry| !entry.trim().is_empty())
            .enumerate()
        {
            let Some((token, scope_list)) = entry.split_once('=') else {
                warn!("⚠️ [AUTH_REGISTRY]: Ignoring malformed grant entry #{}.", entry_index);
                continue;
            };

            let scopes: HashSet<String> = scope_list
                .split(',')
                .map(|scope| scope.trim().to_string())
                .filter(|scope| !scope.is_empty())
                .collect();

            grants_by_token.insert(
                token.trim().to_string(),
                OperatorGrant {
                    operator_uuid: format!("operator-{}", entry_index),
                    operator_name: format!("operator-{}", entry_index),
                    scopes,
                },
            );
        }

        Self { grants_by_token }
    }

    pub fn resolve(&self, token: &str) -> Option<OperatorGrant> {
        self.grants_by_token.get(token).cloned()
    }
}

/**
 * Guardia perimetral: resuelve el bearer token y inyecta el grant.
 */
pub async fn auth_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header_content = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let bearer_token = match auth_header_content {
        Some(header_value) if header_value.starts_with("Bearer ") => &header_value[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match application_state.grant_registry.resolve(bearer_token) {
        Some(grant) => {
            debug!("🔐 [AUTH]: Operator [{}] recognized.", grant.operator_name);
            request.extensions_mut().insert(grant);
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}
