// src/services/lots.rs

// Numeração sequencial de lotes e ordem FIFO densa (1..=N).

use chrono::{NaiveDate, Utc};

use crate::{
    common::{
        error::AppError,
        quantity::{checked_total_units, to_boxes_and_loose, to_total_units},
    },
    models::{
        inventory::{Lot, LotChange, Product},
        operations::LotAssignment,
    },
    services::stock::refresh_stock,
};

/// Sufixo numérico final do número do lote ("OL0009" -> 9).
fn trailing_sequence(number: &str) -> Option<u64> {
    let digits_start = number
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    number[digits_start..].parse().ok()
}

/// Próximo número de lote: maior sufixo existente + 1, com 4 dígitos.
pub fn next_lot_number(prefix: &str, lots: &[Lot]) -> String {
    let max = lots
        .iter()
        .filter_map(|lot| trailing_sequence(&lot.number))
        .max()
        .unwrap_or(0);
    format!("{prefix}{:04}", max + 1)
}

pub fn next_lot_order(lots: &[Lot]) -> u32 {
    lots.iter().map(|lot| lot.order).max().unwrap_or(0) + 1
}

/// Reordena pela posição atual e renumera 1..=N sem buracos.
/// A ordenação é estável: empates mantêm a ordem de entrada.
pub fn reorder_lots(lots: &mut [Lot]) {
    lots.sort_by_key(|lot| lot.order);
    for (index, lot) in lots.iter_mut().enumerate() {
        lot.order = index as u32 + 1;
    }
}

pub fn validate_lot(boxes: i64, loose: i64, units_per_box: i64) -> Result<(), AppError> {
    if boxes < 0 || loose < 0 {
        return Err(AppError::InvalidRequest(
            "caixas e unidades avulsas não podem ser negativas".into(),
        ));
    }
    if loose >= units_per_box {
        return Err(AppError::InvalidRequest(format!(
            "unidades avulsas ({loose}) devem ser menores que unidades por caixa ({units_per_box})"
        )));
    }
    if boxes == 0 && loose == 0 {
        return Err(AppError::InvalidRequest(
            "o lote precisa ter ao menos uma unidade".into(),
        ));
    }
    if checked_total_units(boxes, loose, units_per_box).is_none() {
        return Err(AppError::InvalidRequest(format!(
            "quantidade grande demais: {boxes} caixas de {units_per_box}"
        )));
    }
    Ok(())
}

/// Saldo (caixas, avulsas) de um lote depois de retirar `units`.
///
/// Retira caixas e avulsas separadamente; se faltar avulsa, abre uma caixa.
/// Como as avulsas retiradas são sempre `< units_per_box`, no máximo uma
/// caixa é aberta. `None` se o saldo ficaria negativo.
pub fn deduct_units(
    boxes: i64,
    loose: i64,
    units: i64,
    units_per_box: i64,
) -> Option<(i64, i64)> {
    let (boxes_taken, loose_taken) = to_boxes_and_loose(units, units_per_box);
    debug_assert!(loose_taken < units_per_box);

    let mut boxes_left = boxes - boxes_taken;
    let mut loose_left = loose;
    if loose_left < loose_taken {
        boxes_left -= 1;
        loose_left += units_per_box;
    }
    loose_left -= loose_taken;

    if boxes_left < 0 || loose_left < 0 {
        return None;
    }
    Some((boxes_left, loose_left))
}

/// Remove o lote e mantém a ordem densa. Devolve o lote removido.
pub fn remove_lot(product: &mut Product, number: &str) -> Option<Lot> {
    let index = product.lots.iter().position(|lot| lot.number == number)?;
    let removed = product.lots.remove(index);
    reorder_lots(&mut product.lots);
    refresh_stock(product);
    Some(removed)
}

// Unidades devolvidas a um lote (estorno de confirmação ou cancelamento).
#[derive(Debug, Clone)]
pub struct LotReturn {
    pub lot_number: String,
    pub units: i64,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
}

impl From<&LotAssignment> for LotReturn {
    fn from(assignment: &LotAssignment) -> Self {
        Self {
            lot_number: assignment.lot_number.clone(),
            units: assignment.units,
            production_date: assignment.production_date,
            expiry_date: assignment.expiry_date,
        }
    }
}

/// Devolve unidades aos lotes.
///
/// As unidades só voltam a um lote vivo se número, fabricação e validade
/// coincidem. Caso contrário o lote é recriado e entra na fila FIFO antes do
/// primeiro lote com fabricação igual ou posterior. Se o número original já
/// foi reaproveitado por outra entrada, o lote recriado recebe número novo.
pub fn return_units_to_lots(product: &mut Product, returns: &[LotReturn]) -> Vec<LotChange> {
    let upb = product.units_per_box;
    let mut changes = Vec::new();
    // (número original, número usado na recriação)
    let mut renamed: Vec<(String, String)> = Vec::new();

    reorder_lots(&mut product.lots);

    for ret in returns.iter().filter(|r| r.units > 0) {
        let number = renamed
            .iter()
            .find(|(original, _)| *original == ret.lot_number)
            .map(|(_, new)| new.clone())
            .unwrap_or_else(|| ret.lot_number.clone());

        let same_lot = product.lots.iter_mut().find(|l| {
            l.number == number
                && l.production_date == ret.production_date
                && l.expiry_date == ret.expiry_date
        });

        if let Some(lot) = same_lot {
            let (boxes_before, loose_before) = (lot.boxes, lot.loose_units);
            let total = lot.total_units + ret.units;
            let (boxes, loose) = to_boxes_and_loose(total, upb);
            lot.boxes = boxes;
            lot.loose_units = loose;
            lot.total_units = total;
            changes.push(LotChange {
                lot_number: lot.number.clone(),
                boxes_before,
                loose_before,
                boxes_after: boxes,
                loose_after: loose,
                units_delta: ret.units,
            });
            continue;
        }

        let number = if product.lots.iter().any(|l| l.number == number) {
            let fresh = next_lot_number(&product.sku, &product.lots);
            tracing::warn!(
                "♻️ Lote {} já reaproveitado no produto {}; devolução recriada como {}",
                ret.lot_number,
                product.sku,
                fresh
            );
            renamed.push((ret.lot_number.clone(), fresh.clone()));
            fresh
        } else {
            number
        };

        let (boxes, loose) = to_boxes_and_loose(ret.units, upb);
        let position = product
            .lots
            .iter()
            .position(|l| l.production_date >= ret.production_date)
            .unwrap_or(product.lots.len());
        product.lots.insert(
            position,
            Lot {
                number: number.clone(),
                boxes,
                loose_units: loose,
                total_units: to_total_units(boxes, loose, upb),
                production_date: ret.production_date,
                expiry_date: ret.expiry_date,
                order: 0,
                created_at: Utc::now(),
            },
        );
        for (index, lot) in product.lots.iter_mut().enumerate() {
            lot.order = index as u32 + 1;
        }
        changes.push(LotChange {
            lot_number: number,
            boxes_before: 0,
            loose_before: 0,
            boxes_after: boxes,
            loose_after: loose,
            units_delta: ret.units,
        });
    }

    refresh_stock(product);
    changes
}
