// src/services/locks.rs

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// Um mutex assíncrono por documento (produto ou pedido).
///
/// Garante que leitura -> alocação -> gravação de um mesmo documento não se
/// intercale dentro do processo. Entre processos quem protege é a `version`.
#[derive(Clone, Default)]
pub struct EntityLocks {
    locks: Arc<LockMap>,
}

/// Guarda de um documento travado. Ao soltar, remove a entrada do mapa se
/// ninguém mais a referencia, para o registro não crescer sem limite.
pub struct EntityGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // O guard também segura um Arc do mutex; precisa sair antes da contagem
        drop(self.guard.take());
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> EntityGuard {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        EntityGuard {
            id,
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Trava vários documentos sempre em ordem crescente de id, para que
    /// duas requisições concorrentes nunca se bloqueiem mutuamente.
    pub async fn acquire_many(&self, ids: impl IntoIterator<Item = Uuid>) -> Vec<EntityGuard> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}
