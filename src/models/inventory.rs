// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Saldo agregado (projeção dos lotes) ---
// Nunca é editado diretamente: sempre recalculado por `stock::recompute_stock_total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    #[schema(example = 12)]
    pub boxes: i64,
    #[schema(example = 3)]
    pub loose_units: i64,
    #[schema(example = 10)]
    pub units_per_box: i64,
    #[schema(example = 123)]
    pub total_units: i64,
}

impl StockInfo {
    pub fn empty(units_per_box: i64) -> Self {
        Self {
            units_per_box,
            ..Self::default()
        }
    }
}

// --- 2. Lote ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    #[schema(example = "OL0001")]
    pub number: String,
    pub boxes: i64,
    pub loose_units: i64,
    pub total_units: i64,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    /// Posição FIFO, 1 = mais antigo.
    #[schema(example = 1)]
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

// --- 3. Produto ---
// Documento dono dos seus lotes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "OL")]
    pub sku: String,
    #[schema(example = "Azeitona")]
    pub name: String,
    #[schema(example = "Verde")]
    pub variant: Option<String>,
    #[schema(example = "500g")]
    pub presentation: String,
    #[schema(example = 10)]
    pub units_per_box: i64,
    #[schema(example = 20)]
    pub stock_minimum: i64,
    pub stock: StockInfo,
    pub lots: Vec<Lot>,
    pub active: bool,
    /// Controle de concorrência otimista, incrementado a cada gravação.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sku: input.sku,
            name: input.name,
            variant: input.variant,
            presentation: input.presentation,
            units_per_box: input.units_per_box,
            stock_minimum: input.stock_minimum,
            stock: StockInfo::empty(input.units_per_box),
            lots: Vec::new(),
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Nome completo: nome + variante + apresentação.
    pub fn full_name(&self) -> String {
        [Some(self.name.as_str()), self.variant.as_deref(), Some(self.presentation.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn find_lot(&self, number: &str) -> Option<&Lot> {
        self.lots.iter().find(|lot| lot.number == number)
    }

    pub fn find_lot_mut(&mut self, number: &str) -> Option<&mut Lot> {
        self.lots.iter_mut().find(|lot| lot.number == number)
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub variant: Option<String>,
    pub presentation: String,
    pub units_per_box: i64,
    pub stock_minimum: i64,
}

// Entrada de estoque (novo lote).
#[derive(Debug, Clone)]
pub struct NewLot {
    pub boxes: i64,
    pub loose_units: i64,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

// Edição manual de um lote existente.
#[derive(Debug, Clone)]
pub struct LotEdit {
    pub boxes: i64,
    pub loose_units: i64,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    /// Remove a validade do lote. Não pode vir junto com `expiry_date`.
    pub clear_expiry: bool,
    pub reason: String,
}

// --- 4. Movimentações de Estoque (livro-razão) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementType {
    Intake,         // "INTAKE"
    OrderDeduction, // "ORDER_DEDUCTION"
    Adjustment,     // "ADJUSTMENT"
    LotRemoval,     // "LOT_REMOVAL"
    OrderReversal,  // "ORDER_REVERSAL"
}

/// Registro imutável de uma alteração em um lote.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub movement_type: StockMovementType,
    pub product_id: Uuid,
    pub product_name: String,
    pub lot_number: String,
    pub boxes_before: i64,
    pub loose_before: i64,
    pub boxes_after: i64,
    pub loose_after: i64,
    /// Positivo em entradas, negativo em baixas.
    pub units_delta: i64,
    pub reason: String,
    pub order_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// Antes/depois de um lote, usado para gerar a movimentação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotChange {
    pub lot_number: String,
    pub boxes_before: i64,
    pub loose_before: i64,
    pub boxes_after: i64,
    pub loose_after: i64,
    pub units_delta: i64,
}

impl LotChange {
    pub fn into_movement(
        self,
        product: &Product,
        movement_type: StockMovementType,
        reason: &str,
        actor_id: Uuid,
        order: Option<(Uuid, &str)>,
    ) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            movement_type,
            product_id: product.id,
            product_name: product.full_name(),
            lot_number: self.lot_number,
            boxes_before: self.boxes_before,
            loose_before: self.loose_before,
            boxes_after: self.boxes_after,
            loose_after: self.loose_after,
            units_delta: self.units_delta,
            reason: reason.to_string(),
            order_id: order.map(|(id, _)| id),
            order_number: order.map(|(_, number)| number.to_string()),
            actor_id,
            created_at: Utc::now(),
        }
    }
}

// Lote com o produto dono, para a consulta de vencimentos.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringLot {
    pub product_id: Uuid,
    pub product_name: String,
    pub lot: Lot,
    pub days_to_expiry: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(variant: Option<&str>) -> Product {
        Product::new(NewProduct {
            sku: "OL".into(),
            name: "Azeitona".into(),
            variant: variant.map(String::from),
            presentation: "500g".into(),
            units_per_box: 10,
            stock_minimum: 5,
        })
    }

    #[test]
    fn full_name_joins_name_variant_and_presentation() {
        assert_eq!(product(Some("Verde")).full_name(), "Azeitona Verde 500g");
        assert_eq!(product(None).full_name(), "Azeitona 500g");
        assert_eq!(product(Some("  ")).full_name(), "Azeitona 500g");
    }

    #[test]
    fn new_product_starts_empty_and_active() {
        let p = product(None);
        assert!(p.active);
        assert!(p.lots.is_empty());
        assert_eq!(p.stock, StockInfo::empty(10));
        assert_eq!(p.version, 0);
    }
}
