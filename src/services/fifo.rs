// src/services/fifo.rs

// Alocador FIFO: decide de quais lotes sai cada unidade pedida.
// Função pura: não toca em nada persistido, só devolve o plano.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    common::quantity::{checked_total_units, to_boxes_and_loose, to_total_units},
    models::{
        inventory::{Lot, LotChange, Product},
        operations::LotAssignment,
    },
    services::{
        lots::{deduct_units, reorder_lots},
        stock::refresh_stock,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("sem lotes em estoque")]
    NoStockAvailable,
    #[error("estoque insuficiente: necessário {required}, disponível {available}")]
    InsufficientStock { required: i64, available: i64 },
    #[error("o lote {lot} ficaria com saldo negativo")]
    InconsistentLot { lot: String },
}

/// Resultado da alocação para um único lote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotConsumption {
    pub lot_number: String,
    pub boxes_taken: i64,
    pub loose_taken: i64,
    pub units_taken: i64,
    pub boxes_remaining: i64,
    pub loose_remaining: i64,
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub units_required: i64,
    pub units_available: i64,
    /// Em ordem FIFO; lotes não tocados ficam de fora.
    pub consumptions: Vec<LotConsumption>,
}

pub fn allocate(
    lots: &[Lot],
    units_per_box: i64,
    boxes_required: i64,
    loose_required: i64,
) -> Result<AllocationPlan, AllocationError> {
    if boxes_required < 0 || loose_required < 0 {
        return Err(AllocationError::InvalidRequest(format!(
            "quantidade negativa: {boxes_required} caixas, {loose_required} avulsas"
        )));
    }
    if units_per_box < 1 {
        return Err(AllocationError::InvalidRequest(format!(
            "unidades por caixa inválidas: {units_per_box}"
        )));
    }
    if lots.is_empty() {
        return Err(AllocationError::NoStockAvailable);
    }

    let units_required = checked_total_units(boxes_required, loose_required, units_per_box)
        .ok_or_else(|| {
            AllocationError::InvalidRequest(format!(
                "quantidade grande demais: {boxes_required} caixas, {loose_required} avulsas"
            ))
        })?;
    let units_available: i64 = lots.iter().map(|lot| lot.total_units).sum();
    if units_required > units_available {
        return Err(AllocationError::InsufficientStock {
            required: units_required,
            available: units_available,
        });
    }

    // Ordenação estável: empates ficam na ordem de entrada.
    let mut ordered: Vec<&Lot> = lots.iter().collect();
    ordered.sort_by_key(|lot| lot.order);
    if ordered.windows(2).any(|pair| pair[0].order == pair[1].order) {
        tracing::warn!(
            "⚠️ Lotes com a mesma posição FIFO ({}); usando a ordem armazenada",
            ordered.iter().map(|l| l.number.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    let mut units_pending = units_required;
    let mut consumptions = Vec::new();

    for lot in ordered {
        if units_pending == 0 {
            break;
        }
        if lot.total_units <= 0 {
            continue;
        }

        let units_taken = units_pending.min(lot.total_units);
        let (boxes_taken, loose_taken) = to_boxes_and_loose(units_taken, units_per_box);
        let (boxes_remaining, loose_remaining) =
            deduct_units(lot.boxes, lot.loose_units, units_taken, units_per_box).ok_or_else(
                || AllocationError::InconsistentLot { lot: lot.number.clone() },
            )?;

        consumptions.push(LotConsumption {
            lot_number: lot.number.clone(),
            boxes_taken,
            loose_taken,
            units_taken,
            boxes_remaining,
            loose_remaining,
            exhausted: boxes_remaining == 0 && loose_remaining == 0,
        });

        units_pending -= units_taken;
    }

    Ok(AllocationPlan {
        units_required,
        units_available,
        consumptions,
    })
}

impl AllocationPlan {
    /// Aplica o plano nos lotes do produto: baixa os saldos, remove os
    /// esgotados, reordena e recalcula o agregado.
    pub fn apply_to(&self, product: &mut Product) -> Result<Vec<LotChange>, AllocationError> {
        let upb = product.units_per_box;
        let mut changes = Vec::with_capacity(self.consumptions.len());

        for consumption in &self.consumptions {
            let lot = product
                .find_lot_mut(&consumption.lot_number)
                .ok_or_else(|| AllocationError::InconsistentLot {
                    lot: consumption.lot_number.clone(),
                })?;

            changes.push(LotChange {
                lot_number: lot.number.clone(),
                boxes_before: lot.boxes,
                loose_before: lot.loose_units,
                boxes_after: consumption.boxes_remaining,
                loose_after: consumption.loose_remaining,
                units_delta: -consumption.units_taken,
            });

            lot.boxes = consumption.boxes_remaining;
            lot.loose_units = consumption.loose_remaining;
            lot.total_units =
                to_total_units(consumption.boxes_remaining, consumption.loose_remaining, upb);
        }

        let before = product.lots.len();
        product.lots.retain(|lot| lot.total_units > 0);
        if product.lots.len() != before {
            reorder_lots(&mut product.lots);
        }
        refresh_stock(product);

        Ok(changes)
    }

    /// Foto dos lotes usados, para gravar na linha do pedido.
    pub fn assignments(&self, lots: &[Lot]) -> Vec<LotAssignment> {
        self.consumptions
            .iter()
            .filter_map(|c| {
                let lot = lots.iter().find(|lot| lot.number == c.lot_number)?;
                Some(LotAssignment {
                    lot_number: c.lot_number.clone(),
                    boxes: c.boxes_taken,
                    loose_units: c.loose_taken,
                    units: c.units_taken,
                    production_date: lot.production_date,
                    expiry_date: lot.expiry_date,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::NewProduct;
    use chrono::{NaiveDate, Utc};

    fn lot(number: &str, boxes: i64, loose: i64, order: u32) -> Lot {
        Lot {
            number: number.into(),
            boxes,
            loose_units: loose,
            total_units: to_total_units(boxes, loose, 10),
            production_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 11, 1),
            order,
            created_at: Utc::now(),
        }
    }

    fn product_with(lots: Vec<Lot>) -> Product {
        let mut p = Product::new(NewProduct {
            sku: "OL".into(),
            name: "Azeitona".into(),
            variant: None,
            presentation: "1kg".into(),
            units_per_box: 10,
            stock_minimum: 0,
        });
        p.lots = lots;
        refresh_stock(&mut p);
        p
    }

    #[test]
    fn consumes_oldest_lot_first_and_borrows_a_box() {
        let lots = vec![lot("OL0001", 2, 0, 1), lot("OL0002", 5, 0, 2)];
        let plan = allocate(&lots, 10, 2, 5).unwrap();

        assert_eq!(plan.units_required, 25);
        assert_eq!(plan.units_available, 70);
        assert_eq!(
            plan.consumptions,
            vec![
                LotConsumption {
                    lot_number: "OL0001".into(),
                    boxes_taken: 2,
                    loose_taken: 0,
                    units_taken: 20,
                    boxes_remaining: 0,
                    loose_remaining: 0,
                    exhausted: true,
                },
                LotConsumption {
                    lot_number: "OL0002".into(),
                    boxes_taken: 0,
                    loose_taken: 5,
                    units_taken: 5,
                    boxes_remaining: 4,
                    loose_remaining: 5,
                    exhausted: false,
                },
            ]
        );
    }

    #[test]
    fn walks_by_rank_not_by_storage_position() {
        let lots = vec![lot("NEW", 5, 0, 2), lot("OLD", 1, 0, 1)];
        let plan = allocate(&lots, 10, 1, 0).unwrap();
        assert_eq!(plan.consumptions.len(), 1);
        assert_eq!(plan.consumptions[0].lot_number, "OLD");
    }

    #[test]
    fn stops_once_request_is_covered() {
        let lots = vec![lot("A", 3, 0, 1), lot("B", 3, 0, 2), lot("C", 3, 0, 3)];
        let plan = allocate(&lots, 10, 1, 0).unwrap();
        assert_eq!(plan.consumptions.len(), 1);
        assert!(!plan.consumptions[0].exhausted);
    }

    #[test]
    fn insufficient_stock_reports_both_numbers() {
        let lots = vec![lot("OL0001", 0, 3, 1)];
        assert_eq!(
            allocate(&lots, 10, 0, 5),
            Err(AllocationError::InsufficientStock { required: 5, available: 3 })
        );
    }

    #[test]
    fn one_unit_over_available_is_rejected() {
        let lots = vec![lot("A", 2, 3, 1), lot("B", 1, 0, 2)];
        assert_eq!(
            allocate(&lots, 10, 3, 4),
            Err(AllocationError::InsufficientStock { required: 34, available: 33 })
        );
    }

    #[test]
    fn rejects_negative_and_empty_inputs() {
        let lots = vec![lot("A", 1, 0, 1)];
        assert!(matches!(allocate(&lots, 10, -1, 0), Err(AllocationError::InvalidRequest(_))));
        assert!(matches!(allocate(&lots, 10, 0, -3), Err(AllocationError::InvalidRequest(_))));
        assert_eq!(allocate(&[], 10, 1, 0), Err(AllocationError::NoStockAvailable));
    }

    #[test]
    fn request_too_large_for_i64_is_invalid() {
        let lots = vec![lot("A", 1, 0, 1)];
        assert!(matches!(
            allocate(&lots, 10, i64::MAX / 5, 0),
            Err(AllocationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn zero_request_yields_empty_plan() {
        let lots = vec![lot("A", 1, 0, 1)];
        let plan = allocate(&lots, 10, 0, 0).unwrap();
        assert!(plan.consumptions.is_empty());
    }

    #[test]
    fn same_input_gives_same_plan() {
        let lots = vec![lot("A", 1, 7, 1), lot("B", 2, 2, 2), lot("C", 0, 9, 3)];
        assert_eq!(allocate(&lots, 10, 3, 1), allocate(&lots, 10, 3, 1));
    }

    #[test]
    fn duplicated_rank_is_processed_in_input_order() {
        let lots = vec![lot("X", 1, 0, 1), lot("Y", 1, 0, 1)];
        let plan = allocate(&lots, 10, 1, 5).unwrap();
        let names: Vec<_> = plan.consumptions.iter().map(|c| c.lot_number.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn higher_rank_untouched_while_lower_rank_has_units() {
        let lots = vec![lot("A", 1, 5, 1), lot("B", 4, 0, 2), lot("C", 4, 0, 3)];
        for units in 1..=95 {
            let plan = allocate(&lots, 10, 0, units).unwrap();
            for pair in plan.consumptions.windows(2) {
                assert!(pair[0].exhausted, "lote {} tocado antes de esgotar o anterior", pair[1].lot_number);
            }
        }
    }

    #[test]
    fn applying_conserves_units_and_resequences() {
        let mut product = product_with(vec![lot("OL0001", 2, 0, 1), lot("OL0002", 5, 0, 2)]);
        let before = product.stock.total_units;

        let plan = allocate(&product.lots, 10, 2, 5).unwrap();
        let assignments = plan.assignments(&product.lots);
        let changes = plan.apply_to(&mut product).unwrap();

        assert_eq!(product.stock.total_units, before - 25);
        assert_eq!(product.lots.len(), 1);
        let remaining = &product.lots[0];
        assert_eq!(
            (remaining.number.as_str(), remaining.order, remaining.boxes, remaining.loose_units, remaining.total_units),
            ("OL0002", 1, 4, 5, 45)
        );
        assert_eq!(changes.iter().map(|c| c.units_delta).sum::<i64>(), -25);
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].units, 20);
        assert_eq!(assignments[1].loose_units, 5);
    }

    #[test]
    fn exact_total_empties_every_lot() {
        let mut product = product_with(vec![lot("A", 1, 3, 1), lot("B", 0, 9, 2)]);
        let plan = allocate(&product.lots, 10, 2, 2).unwrap();
        assert!(plan.consumptions.iter().all(|c| c.exhausted));

        plan.apply_to(&mut product).unwrap();
        assert!(product.lots.is_empty());
        assert_eq!((product.stock.boxes, product.stock.loose_units, product.stock.total_units), (0, 0, 0));
    }
}
