// src/common/quantity.rs

// Conversão entre (caixas, unidades avulsas) e total de unidades.
// Todo produto tem um fator fixo `units_per_box` (>= 1).

/// Converte caixas + avulsas em unidades totais.
/// Para valores já validados (lotes gravados); entrada externa passa por
/// `checked_total_units`.
pub fn to_total_units(boxes: i64, loose: i64, units_per_box: i64) -> i64 {
    boxes * units_per_box + loose
}

/// Igual a `to_total_units`, mas `None` se o total não cabe em `i64`.
pub fn checked_total_units(boxes: i64, loose: i64, units_per_box: i64) -> Option<i64> {
    boxes.checked_mul(units_per_box)?.checked_add(loose)
}

/// Decompõe um total de unidades em (caixas cheias, avulsas).
/// O resto sempre fica em `0..units_per_box`.
pub fn to_boxes_and_loose(units: i64, units_per_box: i64) -> (i64, i64) {
    debug_assert!(units_per_box >= 1, "units_per_box deve ser >= 1");
    (units.div_euclid(units_per_box), units.rem_euclid(units_per_box))
}
