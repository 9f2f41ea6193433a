// src/models/operations.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    InPreparation,
    Approved,
    Ready,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Take,
    Confirm,
    MarkReady,
    Cancel,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderState::Pending => "pending",
            OrderState::InPreparation => "in_preparation",
            OrderState::Approved => "approved",
            OrderState::Ready => "ready",
            OrderState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderAction::Take => "take",
            OrderAction::Confirm => "confirm",
            OrderAction::MarkReady => "mark_ready",
            OrderAction::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

impl OrderState {
    /// Próximo estado para a ação, ou `None` se a transição não existe.
    ///
    /// pending --take--> in_preparation --confirm--> approved --mark_ready--> ready
    /// pending | in_preparation | approved --cancel--> cancelled
    pub fn next(self, action: OrderAction) -> Option<OrderState> {
        use OrderAction::*;
        use OrderState::*;
        if self.is_terminal() {
            return None;
        }
        match (self, action) {
            (Pending, Take) => Some(InPreparation),
            (InPreparation, Confirm) => Some(Approved),
            (Approved, MarkReady) => Some(Ready),
            (Pending | InPreparation | Approved, Cancel) => Some(Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Ready | OrderState::Cancelled)
    }
}

// --- Structs de Operação ---

/// De qual lote saiu cada parte de uma linha (foto no momento da aprovação).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotAssignment {
    #[schema(example = "OL0001")]
    pub lot_number: String,
    pub boxes: i64,
    pub loose_units: i64,
    pub units: i64,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    #[schema(example = "Azeitona Verde 500g")]
    pub product_name: String,
    #[schema(example = "OL")]
    pub sku: String,
    pub units_per_box: i64,
    pub boxes: i64,
    pub loose_units: i64,
    pub total_units: i64,
    pub lots_assigned: Vec<LotAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "PED-000042")]
    pub number: String,
    pub customer_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub state: OrderState,
    /// Alguma linha pedia mais que o estoque na criação (apenas informativo).
    pub stock_insufficient: bool,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub assembled_by: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Order {
    /// Valida a transição contra o estado atual e devolve o estado de destino.
    pub fn check_transition(&self, action: OrderAction) -> Result<OrderState, AppError> {
        self.state.next(action).ok_or_else(|| AppError::StateTransition {
            order: self.number.clone(),
            state: self.state,
            action,
        })
    }
}

// Linha pedida na criação do pedido.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub boxes: i64,
    pub loose_units: i64,
}
