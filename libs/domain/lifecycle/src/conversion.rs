// [libs/domain/lifecycle/src/conversion.rs]
/*!
 * =================================================================
 * APARATO: CONVERSION RATE ENGINE (V3.0 - SAME-UNIT PAIRS)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: TASAS from:to ENTRE RECURSOS DE UN GRUPO
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

use custos_domain_models::config::ConversionMembership;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionFault {
    /// La cantidad origen no es múltiplo de 'from'.
    #[error("amount: {amount} does not fit into conversion rate of: {from_amount}")]
    Indivisible { amount: u64, from_amount: u64 },
}

/// Tasa de conversión: 'from' unidades del recurso origen producen 'to'
/// unidades del destino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate {
    pub from_amount: u64,
    pub to_amount: u64,
}

impl ConversionRate {
    /// Aplica la tasa. La divisibilidad es precondición dura: un resto
    /// no nulo es conflicto para el llamante.
    pub fn convert(&self, source_amount: u64) -> Result<u64, ConversionFault> {
        if self.from_amount == 0 || source_amount % self.from_amount != 0 {
            return Err(ConversionFault::Indivisible {
                amount: source_amount,
                from_amount: self.from_amount,
            });
        }
        Ok((source_amount / self.from_amount) * self.to_amount)
    }
}

fn greatest_common_divisor(mut left: u64, mut right: u64) -> u64 {
    while right != 0 {
        (left, right) = (right, left % right);
    }
    left
}

/// Tasa entre dos miembros del mismo grupo de conversión.
///
/// Con pesos ws (origen) y wt (destino), X origen equivale a X·ws/wt
/// destino; normalizado: from = wt/g, to = ws/g con g = gcd(ws, wt).
pub fn rate_between(
    source: &ConversionMembership,
    target: &ConversionMembership,
) -> Option<ConversionRate> {
    if source.identifier != target.identifier || source.weight == 0 || target.weight == 0 {
        return None;
    }

    let divisor = greatest_common_divisor(source.weight, target.weight);
    Some(ConversionRate {
        from_amount: target.weight / divisor,
        to_amount: source.weight / divisor,
    })
}
