// [libs/domain/models/src/commitment.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT DOMAIN MODELS (V3.1 - LIFECYCLE MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD SOBERANA DE RESERVA DE CAPACIDAD Y SU CONTEXTO
 *
 * VISION 2026:
 * 1. EXPLICIT OPTIONALITY: Todo campo opcional es 'Option<T>'. Sin
 *    valores centinela en banda.
 * 2. CONTEXT CHAINS: Los contextos de creación/supersesión/renovación
 *    transportan los enlaces 'related' que permiten reconstruir la
 *    cadena histórica desde cualquier fila terminal.
 * =================================================================
 */

use chrono::{DateTime, Duration as TimeDelta, Months, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::resource::ResourceUnit;

/// Estados del ciclo de vida de un compromiso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    /// Creado con 'confirm_by' futuro; aún no elegible para confirmación.
    Planned,
    /// El reloj alcanzó 'confirm_by'; espera la aceptación del backend.
    Pending,
    /// Aceptado por el backend; cuenta en el total confirmado.
    Confirmed,
    /// Terminal: reemplazado por merge, split o conversión.
    Superseded,
    /// Terminal: el reloj alcanzó 'expires_at'.
    Expired,
}

impl CommitmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Superseded => "superseded",
            Self::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "planned" => Some(Self::Planned),
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "superseded" => Some(Self::Superseded),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Terminal = nunca abandona este estado (propiedad de no-resurrección).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Superseded | Self::Expired)
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Visibilidad de un compromiso en el mercado de transferencias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Sin transferencia activa. Equivale a 'transfer_token' ausente.
    #[default]
    None,
    /// Reclamable solo por quien posea el token (compartido fuera de banda).
    Unlisted,
    /// Visible en el listado público de compromisos ofertados.
    Public,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" | "" => Some(Self::None),
            "unlisted" => Some(Self::Unlisted),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Razón tipificada que acompaña cada mutación del ciclo de vida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentReason {
    Create,
    Merge,
    Split,
    Convert,
    Renew,
    /// Consumo de una oferta pública por el camino de confirmación inmediata.
    Consume,
}

/// Contexto serializado con cada mutación: razón + enlaces 'related'.
///
/// La cadena de relaciones (originales, splits, supersesiones, renovaciones,
/// merges) es inmutable y append-only; como máximo un salto de actualización
/// por commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentWorkflowContext {
    pub reason: CommitmentReason,
    #[serde(rename = "relatedCommitmentIDs", default)]
    pub related_commitment_ids: Vec<i64>,
    #[serde(rename = "relatedCommitmentUUIDs", default)]
    pub related_commitment_uuids: Vec<String>,
}

impl CommitmentWorkflowContext {
    pub fn new(reason: CommitmentReason) -> Self {
        Self {
            reason,
            related_commitment_ids: Vec::new(),
            related_commitment_uuids: Vec::new(),
        }
    }

    pub fn with_related(reason: CommitmentReason, related: &[(i64, &str)]) -> Self {
        Self {
            reason,
            related_commitment_ids: related.iter().map(|(id, _)| *id).collect(),
            related_commitment_uuids: related
                .iter()
                .map(|(_, uuid)| (*uuid).to_string())
                .collect(),
        }
    }
}

/// Duración de compromiso con aritmética de calendario.
///
/// Forma textual canónica: componentes no nulos en orden descendente,
/// p.ej. "1 hour", "2 years", "1 year, 6 months".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitmentDuration {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl CommitmentDuration {
    pub fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }

    /// Aplica la duración sobre un instante base.
    ///
    /// Años y meses usan aritmética de calendario (saturando al último día
    /// del mes destino); el resto son deltas físicos exactos.
    pub fn add_to(&self, base: DateTime<Utc>) -> DateTime<Utc> {
        let with_calendar_fields = base
            .checked_add_months(Months::new(self.years * 12 + self.months))
            .unwrap_or(base);

        with_calendar_fields
            + TimeDelta::days(i64::from(self.days))
            + TimeDelta::hours(i64::from(self.hours))
            + TimeDelta::minutes(i64::from(self.minutes))
            + TimeDelta::seconds(i64::from(self.seconds))
    }
}

impl fmt::Display for CommitmentDuration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: [(u32, &str); 6] = [
            (self.years, "year"),
            (self.months, "month"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ];

        let mut rendered_any = false;
        for (magnitude, unit_label) in components {
            if magnitude == 0 {
                continue;
            }
            if rendered_any {
                formatter.write_str(", ")?;
            }
            let plural_suffix = if magnitude == 1 { "" } else { "s" };
            write!(formatter, "{} {}{}", magnitude, unit_label, plural_suffix)?;
            rendered_any = true;
        }

        if !rendered_any {
            formatter.write_str("0 seconds")?;
        }
        Ok(())
    }
}

impl FromStr for CommitmentDuration {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parsed_duration = CommitmentDuration::default();
        let tokens: Vec<&str> = raw
            .split(|character: char| character == ',' || character.is_whitespace())
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.is_empty() || tokens.len() % 2 != 0 {
            return Err(format!("malformed commitment duration: {:?}", raw));
        }

        for pair in tokens.chunks(2) {
            let magnitude: u32 = pair[0]
                .parse()
                .map_err(|_| format!("malformed commitment duration: {:?}", raw))?;

            let field_slot = match pair[1].trim_end_matches('s') {
                "year" => &mut parsed_duration.years,
                "month" => &mut parsed_duration.months,
                "day" => &mut parsed_duration.days,
                "hour" => &mut parsed_duration.hours,
                "minute" => &mut parsed_duration.minutes,
                "second" => &mut parsed_duration.seconds,
                unknown => {
                    return Err(format!("unknown duration unit: {:?}", unknown));
                }
            };
            *field_slot += magnitude;
        }

        Ok(parsed_duration)
    }
}

impl Serialize for CommitmentDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CommitmentDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Reserva durable de capacidad por proyecto y zona de disponibilidad.
///
/// Las filas 'Superseded' y 'Expired' se conservan como historia; los
/// listados las filtran por defecto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCommitment {
    pub id: i64,
    pub uuid: String,
    pub project_id: i64,
    pub az_resource_id: i64,
    pub amount: u64,
    pub duration: CommitmentDuration,
    pub created_at: DateTime<Utc>,
    pub creator_uuid: String,
    pub creator_name: String,
    pub confirm_by: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
    pub status: CommitmentStatus,
    pub transfer_status: TransferStatus,
    pub transfer_token: Option<String>,
    pub transfer_started_at: Option<DateTime<Utc>>,
    pub notify_on_confirm: bool,
    pub notified_for_expiration: bool,
    pub creation_context: CommitmentWorkflowContext,
    pub supersede_context: Option<CommitmentWorkflowContext>,
    pub renew_context: Option<CommitmentWorkflowContext>,
}

impl ProjectCommitment {
    /// Un compromiso cuenta en 'total_confirmed' solo en estado Confirmed.
    pub fn counts_towards_confirmed_total(&self) -> bool {
        self.status == CommitmentStatus::Confirmed
    }

    pub fn is_transferring(&self) -> bool {
        self.transfer_status != TransferStatus::None
    }

    pub fn was_renewed(&self) -> bool {
        self.renew_context.is_some()
    }
}

// --- FORMA DE PRESENTACIÓN (API JSON) ---

/// Forma JSON de un compromiso en la superficie HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentDisplay {
    pub uuid: String,
    pub service_type: String,
    pub resource_name: String,
    pub availability_zone: String,
    pub amount: u64,
    pub unit: ResourceUnit,
    pub duration: CommitmentDuration,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_by: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub status: CommitmentStatus,
    pub transfer_status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_be_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_confirm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_renewed: Option<bool>,
}

impl CommitmentDisplay {
    /// Compone la forma de presentación a partir de la fila y su catálogo.
    pub fn from_commitment(
        commitment: &ProjectCommitment,
        service_type: &str,
        resource_name: &str,
        availability_zone: &str,
        unit: ResourceUnit,
        can_be_deleted: bool,
    ) -> Self {
        Self {
            uuid: commitment.uuid.clone(),
            service_type: service_type.to_string(),
            resource_name: resource_name.to_string(),
            availability_zone: availability_zone.to_string(),
            amount: commitment.amount,
            unit,
            duration: commitment.duration,
            created_at: commitment.created_at,
            creator_uuid: Some(commitment.creator_uuid.clone()),
            creator_name: Some(commitment.creator_name.clone()),
            confirm_by: commitment.confirm_by,
            confirmed_at: commitment.confirmed_at,
            expires_at: commitment.expires_at,
            status: commitment.status,
            transfer_status: commitment.transfer_status,
            transfer_token: commitment.transfer_token.clone(),
            can_be_deleted: Some(can_be_deleted),
            notify_on_confirm: Some(commitment.notify_on_confirm),
            was_renewed: Some(commitment.was_renewed()),
        }
    }

    /// Listado público: sin identidad del creador, banderas de notificación,
    /// estado de renovación ni pista de borrado.
    pub fn stripped_for_public(mut self) -> Self {
        self.creator_uuid = None;
        self.creator_name = None;
        self.notify_on_confirm = None;
        self.was_renewed = None;
        self.can_be_deleted = None;
        self
    }
}
