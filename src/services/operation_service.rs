// src/services/operation_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{error::AppError, quantity::checked_total_units},
    db::DocumentStore,
    models::{
        auth::Actor,
        inventory::{LotChange, Product, StockMovementType},
        operations::{LotAssignment, NewOrderLine, Order, OrderAction, OrderLine, OrderState},
    },
    services::{
        fifo::allocate,
        inventory_service::InventoryService,
        locks::EntityLocks,
        lots::LotReturn,
        stock::has_sufficient_stock,
    },
};

const REASON_CONFIRMED: &str = "Pedido confirmado";
const REASON_ROLLBACK: &str = "Estorno de confirmação não concluída";
const REASON_CANCELLED: &str = "Pedido cancelado";

// Produto em preparação durante a confirmação: cópia de trabalho já baixada,
// as alterações por lote e o que devolver em caso de estorno.
struct StagedProduct {
    working: Product,
    changes: Vec<LotChange>,
    returns: Vec<LotReturn>,
}

#[derive(Clone)]
pub struct OperationsService {
    store: Arc<dyn DocumentStore>,
    locks: EntityLocks,
    inventory_service: InventoryService,
}

impl OperationsService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        locks: EntityLocks,
        inventory_service: InventoryService,
    ) -> Self {
        Self {
            store,
            locks,
            inventory_service,
        }
    }

    // --- PEDIDOS ---

    pub async fn create_order(
        &self,
        actor: &Actor,
        customer_id: Uuid,
        lines: Vec<NewOrderLine>,
        notes: Option<String>,
    ) -> Result<Order, AppError> {
        if lines.is_empty() {
            return Err(AppError::InvalidRequest("o pedido precisa de ao menos uma linha".into()));
        }

        let mut products: HashMap<Uuid, Product> = HashMap::new();
        let mut requested: HashMap<Uuid, i64> = HashMap::new();
        let mut order_lines = Vec::with_capacity(lines.len());

        for line in lines {
            if line.boxes < 0 || line.loose_units < 0 {
                return Err(AppError::InvalidRequest("quantidade negativa na linha do pedido".into()));
            }
            if line.boxes == 0 && line.loose_units == 0 {
                return Err(AppError::InvalidRequest("linha do pedido sem quantidade".into()));
            }

            if !products.contains_key(&line.product_id) {
                let product = self.inventory_service.get_product(line.product_id).await?;
                if !product.active {
                    return Err(AppError::InvalidRequest(format!(
                        "o produto '{}' está inativo",
                        product.full_name()
                    )));
                }
                products.insert(product.id, product);
            }
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| AppError::not_found("Produto", line.product_id))?;

            let total_units = checked_total_units(line.boxes, line.loose_units, product.units_per_box)
                .ok_or_else(|| {
                    AppError::InvalidRequest(format!("quantidade grande demais: {} caixas", line.boxes))
                })?;
            let requested_units = requested.entry(product.id).or_default();
            *requested_units = requested_units.checked_add(total_units).ok_or_else(|| {
                AppError::InvalidRequest("soma das linhas grande demais".into())
            })?;

            order_lines.push(OrderLine {
                product_id: product.id,
                product_name: product.full_name(),
                sku: product.sku.clone(),
                units_per_box: product.units_per_box,
                boxes: line.boxes,
                loose_units: line.loose_units,
                total_units,
                lots_assigned: Vec::new(),
            });
        }

        // Apenas informativo: não impede a criação
        let stock_insufficient = requested.iter().any(|(id, units)| {
            products
                .get(id)
                .is_some_and(|p| !has_sufficient_stock(p, 0, *units))
        });

        let sequence = self.store.next_order_sequence().await?;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            number: format!("PED-{sequence:06}"),
            customer_id,
            lines: order_lines,
            state: OrderState::Pending,
            stock_insufficient,
            notes,
            created_by: actor.id,
            assembled_by: None,
            cancelled_by: None,
            cancel_reason: None,
            created_at: now,
            taken_at: None,
            approved_at: None,
            ready_at: None,
            cancelled_at: None,
            updated_at: now,
            version: 0,
        };
        self.store.insert_order(&order).await?;

        if stock_insufficient {
            tracing::warn!("⚠️ Pedido {} criado com estoque insuficiente", order.number);
        } else {
            tracing::info!("🧾 Pedido {} criado", order.number);
        }
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido", order_id))
    }

    // --- TRANSIÇÕES ---

    /// pending -> in_preparation. Quem assume vira o separador do pedido.
    pub async fn take_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order, AppError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.get_order(order_id).await?;

        order.state = order.check_transition(OrderAction::Take)?;
        order.assembled_by = Some(actor.id);
        order.taken_at = Some(Utc::now());

        let saved = self.store.save_order(&order).await?;
        tracing::info!("🙋 Pedido {} assumido por {}", saved.number, actor.id);
        Ok(saved)
    }

    /// in_preparation -> approved, com baixa FIFO de todas as linhas.
    ///
    /// Todos os planos são montados antes de qualquer gravação; se alguma
    /// linha falhar nada é gravado. Se uma gravação falhar no meio, os
    /// produtos já gravados recebem o estorno das unidades.
    pub async fn confirm_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order, AppError> {
        let _order_guard = self.locks.acquire(order_id).await;
        let mut order = self.get_order(order_id).await?;

        let next_state = order.check_transition(OrderAction::Confirm)?;
        if order.assembled_by != Some(actor.id) {
            return Err(AppError::NotOrderAssembler);
        }

        let product_ids: Vec<Uuid> = order.lines.iter().map(|l| l.product_id).collect();
        let _product_guards = self.locks.acquire_many(product_ids.iter().copied()).await;

        // 1. Monta os planos (sem efeitos colaterais)
        let mut staged: Vec<StagedProduct> = Vec::new();
        for product_id in &product_ids {
            if staged.iter().any(|s| s.working.id == *product_id) {
                continue;
            }
            let product = self.inventory_service.get_product(*product_id).await?;
            staged.push(StagedProduct {
                working: product,
                changes: Vec::new(),
                returns: Vec::new(),
            });
        }

        let mut line_assignments: Vec<Vec<LotAssignment>> = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let slot = staged
                .iter_mut()
                .find(|s| s.working.id == line.product_id)
                .ok_or_else(|| AppError::not_found("Produto", line.product_id))?;
            let product_name = slot.working.full_name();

            if slot.working.units_per_box != line.units_per_box {
                tracing::warn!(
                    "⚠️ Unidades por caixa de {} mudaram desde a criação do pedido {} ({} -> {})",
                    slot.working.sku,
                    order.number,
                    line.units_per_box,
                    slot.working.units_per_box
                );
            }

            let plan = allocate(
                &slot.working.lots,
                slot.working.units_per_box,
                line.boxes,
                line.loose_units,
            )
            .map_err(|e| AppError::from_allocation(&product_name, e))?;

            let assignments = plan.assignments(&slot.working.lots);
            let changes = plan
                .apply_to(&mut slot.working)
                .map_err(|e| AppError::from_allocation(&product_name, e))?;

            slot.changes.extend(changes);
            slot.returns.extend(assignments.iter().map(LotReturn::from));
            line_assignments.push(assignments);
        }

        // 2. Grava os produtos, um documento por vez
        let order_ref = (order.id, order.number.clone());
        let mut committed: Vec<&StagedProduct> = Vec::new();
        for slot in &staged {
            match self.store.save_product(&slot.working).await {
                Ok(saved) => {
                    self.inventory_service
                        .record_movements(
                            &saved,
                            slot.changes.clone(),
                            StockMovementType::OrderDeduction,
                            REASON_CONFIRMED,
                            actor.id,
                            Some((order_ref.0, order_ref.1.as_str())),
                        )
                        .await;
                    committed.push(slot);
                }
                Err(e) => {
                    tracing::warn!(
                        "🔁 Falha ao gravar o produto {} na confirmação do pedido {}: {}",
                        slot.working.sku,
                        order.number,
                        e
                    );
                    self.roll_back(&committed, actor, &order_ref).await;
                    return Err(e);
                }
            }
        }

        // 3. Avança o pedido
        for (line, assignments) in order.lines.iter_mut().zip(line_assignments) {
            line.lots_assigned = assignments;
        }
        order.state = next_state;
        order.approved_at = Some(Utc::now());

        match self.store.save_order(&order).await {
            Ok(saved) => {
                tracing::info!(
                    "✅ Pedido {} aprovado ({} produtos baixados)",
                    saved.number,
                    staged.len()
                );
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!("🔁 Falha ao gravar o pedido {} aprovado: {}", order.number, e);
                self.roll_back(&committed, actor, &order_ref).await;
                Err(e)
            }
        }
    }

    /// approved -> ready.
    pub async fn mark_ready(&self, order_id: Uuid, actor: &Actor) -> Result<Order, AppError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.get_order(order_id).await?;

        order.state = order.check_transition(OrderAction::MarkReady)?;
        order.ready_at = Some(Utc::now());

        let saved = self.store.save_order(&order).await?;
        tracing::info!("📦 Pedido {} pronto (por {})", saved.number, actor.id);
        Ok(saved)
    }

    /// Cancela o pedido. Se já estava aprovado, devolve as unidades aos lotes.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Order, AppError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.get_order(order_id).await?;

        let previous = order.state;
        order.state = order.check_transition(OrderAction::Cancel)?;
        order.cancelled_by = Some(actor.id);
        order.cancelled_at = Some(Utc::now());
        order.cancel_reason = reason;

        // O pedido é gravado antes do estorno: a checagem de versão garante
        // que só um cancelamento devolve o estoque.
        let saved = self.store.save_order(&order).await?;

        if previous == OrderState::Approved {
            let mut returns: Vec<(Uuid, Vec<LotReturn>)> = Vec::new();
            for line in &saved.lines {
                let line_returns = line.lots_assigned.iter().map(LotReturn::from);
                match returns.iter_mut().find(|(id, _)| *id == line.product_id) {
                    Some((_, existing)) => existing.extend(line_returns),
                    None => returns.push((line.product_id, line_returns.collect())),
                }
            }

            // Um produto que falha não impede a devolução dos demais
            let _product_guards = self.locks.acquire_many(returns.iter().map(|(id, _)| *id)).await;
            let mut not_restocked = Vec::new();
            for (product_id, product_returns) in &returns {
                if let Err(e) = self
                    .inventory_service
                    .return_units_locked(
                        *product_id,
                        product_returns,
                        REASON_CANCELLED,
                        actor.id,
                        Some((saved.id, saved.number.as_str())),
                    )
                    .await
                {
                    tracing::error!(
                        "🔥 Pedido {} cancelado mas o estoque do produto {} não foi devolvido: {:?}",
                        saved.number,
                        product_id,
                        e
                    );
                    not_restocked.push(product_id.to_string());
                }
            }

            if !not_restocked.is_empty() {
                return Err(AppError::RestockIncomplete {
                    order: saved.number.clone(),
                    products: not_restocked,
                });
            }
        }

        tracing::info!("🚫 Pedido {} cancelado (estava '{}')", saved.number, previous);
        Ok(saved)
    }

    // Estorno dos produtos já gravados numa confirmação que não terminou.
    async fn roll_back(&self, committed: &[&StagedProduct], actor: &Actor, order_ref: &(Uuid, String)) {
        for slot in committed {
            if let Err(e) = self
                .inventory_service
                .return_units_locked(
                    slot.working.id,
                    &slot.returns,
                    REASON_ROLLBACK,
                    actor.id,
                    Some((order_ref.0, order_ref.1.as_str())),
                )
                .await
            {
                tracing::error!(
                    "🔥 Estorno do produto {} falhou para o pedido {}; ajuste manual necessário: {:?}",
                    slot.working.sku,
                    order_ref.1,
                    e
                );
            }
        }
    }
}
