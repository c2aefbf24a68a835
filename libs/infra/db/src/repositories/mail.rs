// [libs/infra/db/src/repositories/mail.rs]
/*!
 * =================================================================
 * APARATO: MAIL QUEUE REPOSITORY (V3.0 - HERALD OUTBOX)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DE NOTIFICACIONES POR PROYECTO
 *
 * El renderizado de plantillas y el despacho real quedan fuera del
 * núcleo; esta cola es el contrato estrecho que los alimenta.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use tracing::debug;

use crate::errors::DbError;
use crate::repositories::rowmap::{fmt_instant, int_at, opt_instant_at, text_at};

/// Fila encolada pendiente de despacho.
#[derive(Debug, Clone)]
pub struct QueuedMail {
    pub id: i64,
    pub project_id: i64,
    pub subject: String,
    pub body_json: String,
    pub queued_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

pub struct MailQueueRepository;

impl MailQueueRepository {
    /// Encola una notificación dentro de la transacción del llamante.
    pub async fn enqueue(
        connection: &Connection,
        project_id: i64,
        subject: &str,
        body_json: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        connection
            .execute(
                "INSERT INTO mail_queue (project_id, subject, body_json, queued_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![project_id, subject, body_json, fmt_instant(now)],
            )
            .await?;

        debug!("📮 [HERALD]: Mail queued for project {}: {}", project_id, subject);
        Ok(())
    }

    pub async fn list_unsent(connection: &Connection) -> Result<Vec<QueuedMail>, DbError> {
        let mut rows = connection
            .query(
                "SELECT id, project_id, subject, body_json, queued_at, sent_at
                 FROM mail_queue WHERE sent_at IS NULL ORDER BY id ASC",
                (),
            )
            .await?;

        let mut collected = Vec::new();
        while let Some(row) = rows.next().await? {
            collected.push(QueuedMail {
                id: int_at(&row, 0)?,
                project_id: int_at(&row, 1)?,
                subject: text_at(&row, 2)?,
                body_json: text_at(&row, 3)?,
                queued_at: crate::repositories::rowmap::instant_at(&row, 4)?,
                sent_at: opt_instant_at(&row, 5)?,
            });
        }
        Ok(collected)
    }

    pub async fn mark_sent(
        connection: &Connection,
        mail_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        connection
            .execute(
                "UPDATE mail_queue SET sent_at = ?2 WHERE id = ?1",
                params![mail_id, fmt_instant(now)],
            )
            .await?;
        Ok(())
    }
}
