// src/services/stock.rs

// Agregador de estoque: o saldo do produto é sempre derivado dos lotes vivos.

use crate::{
    common::quantity::{checked_total_units, to_boxes_and_loose, to_total_units},
    models::inventory::{Product, StockInfo},
};

/// Soma os lotes e normaliza o excesso de avulsas em caixas.
///
/// `total_units` é a soma crua dos totais dos lotes, não recalculada a partir
/// de caixas/avulsas normalizadas.
pub fn recompute_stock_total(product: &Product) -> StockInfo {
    let upb = product.units_per_box;

    let (boxes, loose, total) = product.lots.iter().fold((0, 0, 0), |(b, l, t), lot| {
        (b + lot.boxes, l + lot.loose_units, t + lot.total_units)
    });

    let (extra_boxes, loose) = if loose >= upb {
        to_boxes_and_loose(loose, upb)
    } else {
        (0, loose)
    };

    StockInfo {
        boxes: boxes + extra_boxes,
        loose_units: loose,
        units_per_box: upb,
        total_units: total,
    }
}

/// Recalcula e grava o saldo no próprio produto.
pub fn refresh_stock(product: &mut Product) {
    product.stock = recompute_stock_total(product);
}

pub fn has_low_stock(product: &Product) -> bool {
    product.stock.total_units <= product.stock_minimum
}

pub fn has_sufficient_stock(product: &Product, boxes_required: i64, loose_required: i64) -> bool {
    // Pedido que nem cabe em i64 nunca é atendido
    checked_total_units(boxes_required, loose_required, product.units_per_box)
        .is_some_and(|required| product.stock.total_units >= required)
}
