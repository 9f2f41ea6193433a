// src/services/inventory_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        quantity::{checked_total_units, to_total_units},
    },
    db::DocumentStore,
    models::inventory::{
        ExpiringLot, Lot, LotChange, LotEdit, NewLot, NewProduct, Product, StockMovement,
        StockMovementType,
    },
    services::{
        locks::EntityLocks,
        lots::{
            deduct_units, next_lot_number, next_lot_order, remove_lot, return_units_to_lots,
            validate_lot, LotReturn,
        },
        stock::{has_low_stock, refresh_stock},
    },
};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn DocumentStore>,
    locks: EntityLocks,
    conflict_retries: u32,
}

impl InventoryService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: EntityLocks, conflict_retries: u32) -> Self {
        Self { store, locks, conflict_retries }
    }

    // --- CATÁLOGO ---

    pub async fn create_product(&self, input: NewProduct) -> Result<Product, AppError> {
        let sku = input.sku.trim().to_ascii_uppercase();
        if sku.is_empty() || !sku.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidRequest(format!(
                "SKU '{}' deve conter apenas letras e números",
                input.sku
            )));
        }
        if input.units_per_box < 1 {
            return Err(AppError::InvalidRequest("unidades por caixa deve ser >= 1".into()));
        }
        if input.stock_minimum < 0 {
            return Err(AppError::InvalidRequest("estoque mínimo não pode ser negativo".into()));
        }

        let product = Product::new(NewProduct { sku, ..input });
        self.store.insert_product(&product).await?;

        tracing::info!("✅ Produto {} ({}) cadastrado", product.full_name(), product.sku);
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto", product_id))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.store.list_products().await
    }

    pub async fn list_low_stock(&self) -> Result<Vec<Product>, AppError> {
        let products = self.store.list_products().await?;
        Ok(products
            .into_iter()
            .filter(|p| p.active && has_low_stock(p))
            .collect())
    }

    pub async fn list_movements(&self, product_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        // Garante 404 para produto inexistente em vez de lista vazia
        self.get_product(product_id).await?;
        self.store.list_movements(product_id).await
    }

    /// Lotes de produtos ativos que vencem até `today + days`, mais próximos primeiro.
    pub async fn expiring_lots(&self, today: NaiveDate, days: i64) -> Result<Vec<ExpiringLot>, AppError> {
        if days < 0 {
            return Err(AppError::InvalidRequest("o número de dias não pode ser negativo".into()));
        }

        let products = self.store.list_products().await?;
        let mut expiring: Vec<ExpiringLot> = products
            .iter()
            .filter(|p| p.active)
            .flat_map(|p| {
                p.lots.iter().filter_map(move |lot| {
                    let expiry = lot.expiry_date?;
                    let days_to_expiry = (expiry - today).num_days();
                    (days_to_expiry <= days).then(|| ExpiringLot {
                        product_id: p.id,
                        product_name: p.full_name(),
                        lot: lot.clone(),
                        days_to_expiry,
                    })
                })
            })
            .collect();

        expiring.sort_by(|a, b| {
            a.days_to_expiry
                .cmp(&b.days_to_expiry)
                .then_with(|| a.lot.number.cmp(&b.lot.number))
        });
        Ok(expiring)
    }

    // --- ENTRADA DE ESTOQUE (NOVO LOTE) ---

    pub async fn add_lot(&self, product_id: Uuid, actor_id: Uuid, input: NewLot) -> Result<Product, AppError> {
        check_dates(input.production_date, input.expiry_date)?;

        let (product, changes) = self
            .mutate_product(product_id, |product| {
                if !product.active {
                    return Err(AppError::InvalidRequest(format!(
                        "o produto '{}' está inativo",
                        product.full_name()
                    )));
                }
                validate_lot(input.boxes, input.loose_units, product.units_per_box)?;

                let lot = Lot {
                    number: next_lot_number(&product.sku, &product.lots),
                    boxes: input.boxes,
                    loose_units: input.loose_units,
                    total_units: to_total_units(input.boxes, input.loose_units, product.units_per_box),
                    production_date: input.production_date,
                    expiry_date: input.expiry_date,
                    order: next_lot_order(&product.lots),
                    created_at: chrono::Utc::now(),
                };
                let change = LotChange {
                    lot_number: lot.number.clone(),
                    boxes_before: 0,
                    loose_before: 0,
                    boxes_after: lot.boxes,
                    loose_after: lot.loose_units,
                    units_delta: lot.total_units,
                };

                product.lots.push(lot);
                refresh_stock(product);
                Ok(vec![change])
            })
            .await?;

        let reason = input.reason.as_deref().unwrap_or("Entrada de estoque");
        self.record_movements(&product, changes, StockMovementType::Intake, reason, actor_id, None)
            .await;

        tracing::info!(
            "📦 Entrada no produto {}: estoque total {} unidades",
            product.sku,
            product.stock.total_units
        );
        Ok(product)
    }

    // --- AJUSTES MANUAIS ---

    /// Baixa manual de um lote, sem passar pelo FIFO.
    pub async fn remove_stock_from_lot(
        &self,
        product_id: Uuid,
        lot_number: &str,
        boxes: i64,
        loose_units: i64,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Product, AppError> {
        if boxes < 0 || loose_units < 0 {
            return Err(AppError::InvalidRequest("quantidade negativa".into()));
        }
        if boxes == 0 && loose_units == 0 {
            return Err(AppError::InvalidRequest("informe ao menos uma unidade para retirar".into()));
        }

        let (product, changes) = self
            .mutate_product(product_id, |product| {
                let upb = product.units_per_box;
                let units = checked_total_units(boxes, loose_units, upb).ok_or_else(|| {
                    AppError::InvalidRequest(format!("quantidade grande demais: {boxes} caixas"))
                })?;
                let product_name = product.full_name();

                let lot = product
                    .find_lot_mut(lot_number)
                    .ok_or_else(|| AppError::not_found("Lote", lot_number))?;
                if units > lot.total_units {
                    return Err(AppError::InsufficientStock {
                        product: format!("{product_name} / {lot_number}"),
                        required: units,
                        available: lot.total_units,
                    });
                }

                let (boxes_after, loose_after) = deduct_units(lot.boxes, lot.loose_units, units, upb)
                    .ok_or_else(|| AppError::InconsistentLot { lot: lot_number.to_string() })?;
                let change = LotChange {
                    lot_number: lot.number.clone(),
                    boxes_before: lot.boxes,
                    loose_before: lot.loose_units,
                    boxes_after,
                    loose_after,
                    units_delta: -units,
                };

                lot.boxes = boxes_after;
                lot.loose_units = loose_after;
                lot.total_units = to_total_units(boxes_after, loose_after, upb);

                if lot.total_units == 0 {
                    remove_lot(product, lot_number);
                } else {
                    refresh_stock(product);
                }
                Ok(vec![change])
            })
            .await?;

        self.record_movements(&product, changes, StockMovementType::Adjustment, reason, actor_id, None)
            .await;
        Ok(product)
    }

    /// Edição manual de quantidades e datas de um lote.
    pub async fn edit_lot(
        &self,
        product_id: Uuid,
        lot_number: &str,
        edit: LotEdit,
        actor_id: Uuid,
    ) -> Result<Product, AppError> {
        let (product, changes) = self
            .mutate_product(product_id, |product| {
                let upb = product.units_per_box;
                validate_lot(edit.boxes, edit.loose_units, upb)?;

                let lot = product
                    .find_lot_mut(lot_number)
                    .ok_or_else(|| AppError::not_found("Lote", lot_number))?;

                if edit.clear_expiry && edit.expiry_date.is_some() {
                    return Err(AppError::InvalidRequest(
                        "informe a nova validade ou peça para removê-la, não ambos".into(),
                    ));
                }
                let production_date = edit.production_date.unwrap_or(lot.production_date);
                let expiry_date = if edit.clear_expiry {
                    None
                } else {
                    edit.expiry_date.or(lot.expiry_date)
                };
                check_dates(production_date, expiry_date)?;

                let new_total = to_total_units(edit.boxes, edit.loose_units, upb);
                let change = LotChange {
                    lot_number: lot.number.clone(),
                    boxes_before: lot.boxes,
                    loose_before: lot.loose_units,
                    boxes_after: edit.boxes,
                    loose_after: edit.loose_units,
                    units_delta: new_total - lot.total_units,
                };

                lot.boxes = edit.boxes;
                lot.loose_units = edit.loose_units;
                lot.total_units = new_total;
                lot.production_date = production_date;
                lot.expiry_date = expiry_date;

                refresh_stock(product);
                Ok(vec![change])
            })
            .await?;

        self.record_movements(&product, changes, StockMovementType::Adjustment, &edit.reason, actor_id, None)
            .await;
        Ok(product)
    }

    /// Exclusão manual de um lote inteiro.
    pub async fn delete_lot(
        &self,
        product_id: Uuid,
        lot_number: &str,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Product, AppError> {
        let (product, changes) = self
            .mutate_product(product_id, |product| {
                let removed = remove_lot(product, lot_number)
                    .ok_or_else(|| AppError::not_found("Lote", lot_number))?;
                Ok(vec![LotChange {
                    lot_number: removed.number,
                    boxes_before: removed.boxes,
                    loose_before: removed.loose_units,
                    boxes_after: 0,
                    loose_after: 0,
                    units_delta: -removed.total_units,
                }])
            })
            .await?;

        self.record_movements(&product, changes, StockMovementType::LotRemoval, reason, actor_id, None)
            .await;

        tracing::info!("🗑️ Lote {} removido do produto {}", lot_number, product.sku);
        Ok(product)
    }

    /// Devolve unidades de um pedido aos lotes (estorno ou cancelamento).
    /// O chamador precisa estar segurando o lock do produto.
    pub(crate) async fn return_units_locked(
        &self,
        product_id: Uuid,
        returns: &[LotReturn],
        reason: &str,
        actor_id: Uuid,
        order: Option<(Uuid, &str)>,
    ) -> Result<Product, AppError> {
        let (product, changes) = self
            .mutate_product_locked(product_id, |product| Ok(return_units_to_lots(product, returns)))
            .await?;

        self.record_movements(&product, changes, StockMovementType::OrderReversal, reason, actor_id, order)
            .await;
        Ok(product)
    }

    // ---
    // Helpers
    // ---

    /// Seção crítica do produto: trava, lê, aplica a mutação e grava com
    /// checagem de versão. Em conflito, relê e tenta de novo.
    async fn mutate_product<F>(
        &self,
        product_id: Uuid,
        mutation: F,
    ) -> Result<(Product, Vec<LotChange>), AppError>
    where
        F: FnMut(&mut Product) -> Result<Vec<LotChange>, AppError> + Send,
    {
        let _guard = self.locks.acquire(product_id).await;
        self.mutate_product_locked(product_id, mutation).await
    }

    /// Igual a `mutate_product`, para quem já segura o lock do produto.
    async fn mutate_product_locked<F>(
        &self,
        product_id: Uuid,
        mut mutation: F,
    ) -> Result<(Product, Vec<LotChange>), AppError>
    where
        F: FnMut(&mut Product) -> Result<Vec<LotChange>, AppError> + Send,
    {
        let mut attempt = 0;

        loop {
            let mut product = self.get_product(product_id).await?;
            let changes = mutation(&mut product)?;
            debug_assert_eq!(
                product.stock.total_units,
                product.lots.iter().map(|l| l.total_units).sum::<i64>()
            );

            match self.store.save_product(&product).await {
                Ok(saved) => return Ok((saved, changes)),
                Err(AppError::PersistenceConflict { .. }) if attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "🔁 Conflito ao gravar o produto {} (tentativa {}), relendo",
                        product_id,
                        attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Grava uma movimentação por lote alterado. Falha aqui não desfaz a
    /// alteração de estoque; só é registrada no log.
    pub(crate) async fn record_movements(
        &self,
        product: &Product,
        changes: Vec<LotChange>,
        movement_type: StockMovementType,
        reason: &str,
        actor_id: Uuid,
        order: Option<(Uuid, &str)>,
    ) {
        for change in changes {
            let movement = change.into_movement(product, movement_type, reason, actor_id, order);
            if let Err(e) = self.store.append_movement(&movement).await {
                tracing::error!(
                    "🔥 Falha ao gravar movimentação do lote {} (produto {}): {:?}",
                    movement.lot_number,
                    product.id,
                    e
                );
            }
        }
    }

}

fn check_dates(production: NaiveDate, expiry: Option<NaiveDate>) -> Result<(), AppError> {
    match expiry {
        Some(expiry) if expiry < production => Err(AppError::InvalidRequest(
            "a validade não pode ser anterior à data de produção".into(),
        )),
        _ => Ok(()),
    }
}

// Usado pelos testes de propriedade do agregado.
#[cfg(test)]
pub(crate) fn assert_product_invariants(product: &Product) {
    let sum: i64 = product.lots.iter().map(|l| l.total_units).sum();
    assert_eq!(product.stock.total_units, sum);
    assert!(product.stock.loose_units >= 0 && product.stock.loose_units < product.units_per_box);
    let mut orders: Vec<u32> = product.lots.iter().map(|l| l.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, (1..=product.lots.len() as u32).collect::<Vec<_>>());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn service() -> InventoryService {
        InventoryService::new(Arc::new(InMemoryStore::new()), EntityLocks::new(), 3)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn new_lot(boxes: i64, loose: i64) -> NewLot {
        NewLot {
            boxes,
            loose_units: loose,
            production_date: date(1, 10),
            expiry_date: Some(date(12, 31)),
            reason: None,
        }
    }

    async fn olive(svc: &InventoryService) -> Product {
        svc.create_product(NewProduct {
            sku: "ol".into(),
            name: "Azeitona".into(),
            variant: Some("Verde".into()),
            presentation: "500g".into(),
            units_per_box: 10,
            stock_minimum: 15,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn intake_numbers_and_ranks_lots() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();

        svc.add_lot(p.id, actor, new_lot(2, 0)).await.unwrap();
        let p = svc.add_lot(p.id, actor, new_lot(1, 4)).await.unwrap();

        assert_eq!(p.sku, "OL");
        let view: Vec<_> = p.lots.iter().map(|l| (l.number.as_str(), l.order)).collect();
        assert_eq!(view, vec![("OL0001", 1), ("OL0002", 2)]);
        assert_eq!(p.stock.total_units, 34);
        assert_product_invariants(&p);

        let movements = svc.list_movements(p.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().all(|m| m.movement_type == StockMovementType::Intake));
        assert_eq!(movements[1].units_delta, 14);
    }

    #[tokio::test]
    async fn intake_rejects_invalid_lots() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();

        for bad in [new_lot(0, 0), new_lot(1, 10), new_lot(-1, 0)] {
            assert!(matches!(
                svc.add_lot(p.id, actor, bad).await,
                Err(AppError::InvalidRequest(_))
            ));
        }
        let mut expired = new_lot(1, 0);
        expired.expiry_date = Some(date(1, 1));
        assert!(svc.add_lot(p.id, actor, expired).await.is_err());
        assert!(svc.list_movements(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_withdrawal_removes_exhausted_lot_and_resequences() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();
        svc.add_lot(p.id, actor, new_lot(1, 0)).await.unwrap();
        svc.add_lot(p.id, actor, new_lot(3, 0)).await.unwrap();

        let p = svc
            .remove_stock_from_lot(p.id, "OL0002", 0, 5, "Avaria", actor)
            .await
            .unwrap();
        let lot2 = p.find_lot("OL0002").unwrap();
        assert_eq!((lot2.boxes, lot2.loose_units), (2, 5));

        let p = svc
            .remove_stock_from_lot(p.id, "OL0001", 1, 0, "Avaria", actor)
            .await
            .unwrap();
        assert!(p.find_lot("OL0001").is_none());
        assert_eq!(p.lots[0].order, 1);
        assert_eq!(p.stock.total_units, 25);
        assert_product_invariants(&p);

        let movements = svc.list_movements(p.id).await.unwrap();
        let last = movements.last().unwrap();
        assert_eq!(last.movement_type, StockMovementType::Adjustment);
        assert_eq!((last.boxes_before, last.boxes_after, last.units_delta), (1, 0, -10));
    }

    #[tokio::test]
    async fn withdrawal_larger_than_lot_is_rejected_without_changes() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();
        svc.add_lot(p.id, actor, new_lot(0, 3)).await.unwrap();

        let err = svc
            .remove_stock_from_lot(p.id, "OL0001", 0, 5, "Avaria", actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { required: 5, available: 3, .. }));

        let p = svc.get_product(p.id).await.unwrap();
        assert_eq!(p.stock.total_units, 3);
    }

    #[tokio::test]
    async fn edit_and_delete_keep_aggregate_consistent() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();
        svc.add_lot(p.id, actor, new_lot(1, 0)).await.unwrap();
        svc.add_lot(p.id, actor, new_lot(2, 0)).await.unwrap();
        svc.add_lot(p.id, actor, new_lot(3, 0)).await.unwrap();

        let p = svc
            .edit_lot(
                p.id,
                "OL0002",
                LotEdit {
                    boxes: 2,
                    loose_units: 7,
                    production_date: None,
                    expiry_date: None,
                    clear_expiry: false,
                    reason: "Recontagem".into(),
                },
                actor,
            )
            .await
            .unwrap();
        assert_eq!(p.stock.total_units, 67);

        let p = svc.delete_lot(p.id, "OL0001", "Descarte", actor).await.unwrap();
        let view: Vec<_> = p.lots.iter().map(|l| (l.number.as_str(), l.order)).collect();
        assert_eq!(view, vec![("OL0002", 1), ("OL0003", 2)]);
        assert_eq!(p.stock.total_units, 57);
        assert_product_invariants(&p);

        let movements = svc.list_movements(p.id).await.unwrap();
        let kinds: Vec<_> = movements.iter().map(|m| m.movement_type).collect();
        assert_eq!(
            &kinds[3..],
            &[StockMovementType::Adjustment, StockMovementType::LotRemoval]
        );
        assert_eq!(movements[3].units_delta, 7);
    }

    #[tokio::test]
    async fn edit_can_clear_the_expiry_date() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();
        svc.add_lot(p.id, actor, new_lot(1, 0)).await.unwrap();
        let edit = |expiry_date, clear_expiry| LotEdit {
            boxes: 1,
            loose_units: 0,
            production_date: None,
            expiry_date,
            clear_expiry,
            reason: "Produto sem validade".into(),
        };

        let err = svc
            .edit_lot(p.id, "OL0001", edit(Some(date(6, 1)), true), actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let kept = svc.edit_lot(p.id, "OL0001", edit(None, false), actor).await.unwrap();
        assert_eq!(kept.lots[0].expiry_date, Some(date(12, 31)));

        let cleared = svc.edit_lot(p.id, "OL0001", edit(None, true), actor).await.unwrap();
        assert_eq!(cleared.lots[0].expiry_date, None);
        assert!(svc.expiring_lots(date(12, 1), 60).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_quantities_are_rejected_instead_of_overflowing() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();

        let err = svc.add_lot(p.id, actor, new_lot(i64::MAX / 2, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        svc.add_lot(p.id, actor, new_lot(1, 0)).await.unwrap();
        let err = svc
            .remove_stock_from_lot(p.id, "OL0001", i64::MAX / 5, 0, "Avaria", actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(svc.get_product(p.id).await.unwrap().stock.total_units, 10);
    }

    #[tokio::test]
    async fn low_stock_and_expiring_queries() {
        let svc = service();
        let p = olive(&svc).await;
        let actor = Uuid::new_v4();
        svc.add_lot(p.id, actor, new_lot(1, 0)).await.unwrap();

        let low = svc.list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);

        let mut soon = new_lot(1, 0);
        soon.expiry_date = Some(date(2, 1));
        svc.add_lot(p.id, actor, soon).await.unwrap();
        assert!(svc.list_low_stock().await.unwrap().is_empty());

        let expiring = svc.expiring_lots(date(1, 20), 30).await.unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].lot.number, "OL0002");
        assert_eq!(expiring[0].days_to_expiry, 12);
    }

    #[tokio::test]
    async fn invalid_product_definitions_are_rejected() {
        let svc = service();
        let base = NewProduct {
            sku: "QJ".into(),
            name: "Queijo".into(),
            variant: None,
            presentation: "1kg".into(),
            units_per_box: 0,
            stock_minimum: 0,
        };
        assert!(svc.create_product(base.clone()).await.is_err());
        assert!(svc
            .create_product(NewProduct { sku: "Q-J".into(), units_per_box: 6, ..base.clone() })
            .await
            .is_err());
        assert!(svc
            .create_product(NewProduct { units_per_box: 6, ..base })
            .await
            .is_ok());
    }
}
