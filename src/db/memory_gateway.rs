// src/db/memory_gateway.rs

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::gateway::PersistenceGateway,
    models::{
        calendar::EventSlot,
        lead::{Lead, LeadChanges},
    },
};

// Backend em memória: serve o binário de demonstração e os testes.
// Permite simular latência por chamada e falhas de rede.
#[derive(Default)]
pub struct MemoryGateway {
    leads: Mutex<HashMap<Uuid, Lead>>,
    event_slots: Mutex<HashMap<Uuid, EventSlot>>,
    reschedule_log: Mutex<Vec<(Uuid, EventSlot)>>,

    // Latências consumidas em ordem, uma por chamada
    latencies: Mutex<VecDeque<Duration>>,
    offline: AtomicBool,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Todas as chamadas falham enquanto estiver offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// As próximas `count` chamadas falham.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Enfileira a latência da próxima chamada.
    pub fn push_latency(&self, latency: Duration) {
        lock(&self.latencies).push_back(latency);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn lead(&self, id: Uuid) -> Option<Lead> {
        lock(&self.leads).get(&id).cloned()
    }

    pub fn event_slot(&self, id: Uuid) -> Option<EventSlot> {
        lock(&self.event_slots).get(&id).copied()
    }

    pub fn reschedules(&self) -> Vec<(Uuid, EventSlot)> {
        lock(&self.reschedule_log).clone()
    }

    // Simula a ida e volta da rede: latência + falha injetada
    async fn round_trip(&self, operation: &str) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = lock(&self.latencies).pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::SyncError(format!("{}: backend offline", operation)));
        }

        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppError::SyncError(format!("{}: falha de rede simulada", operation)));
        }

        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn create_lead(&self, lead: Lead) -> Result<Lead, AppError> {
        self.round_trip("createLead").await?;

        let mut leads = lock(&self.leads);
        // Criação é idempotente pelo ID gerado no cliente
        let stored = leads.entry(lead.id).or_insert(lead);
        Ok(stored.clone())
    }

    async fn update_lead(&self, id: Uuid, changes: LeadChanges) -> Result<Lead, AppError> {
        self.round_trip("updateLead").await?;

        let mut leads = lock(&self.leads);
        let stored = leads
            .get_mut(&id)
            .ok_or_else(|| AppError::SyncError(format!("updateLead: lead {} desconhecido", id)))?;
        changes.apply_to(stored);
        Ok(stored.clone())
    }

    async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        self.round_trip("deleteLead").await?;

        lock(&self.leads).remove(&id);
        Ok(())
    }

    async fn reschedule_event(&self, id: Uuid, slot: EventSlot) -> Result<(), AppError> {
        self.round_trip("rescheduleEvent").await?;

        lock(&self.event_slots).insert(id, slot);
        lock(&self.reschedule_log).push((id, slot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::{LeadStatus, NewLead};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn stores_and_patches_leads() {
        let gateway = MemoryGateway::new();
        let lead = Lead::from_new(NewLead::named("Maria"));
        let id = lead.id;

        gateway.create_lead(lead).await.unwrap();
        let updated = gateway
            .update_lead(
                id,
                LeadChanges {
                    status: Some(LeadStatus::Proposta),
                    ..LeadChanges::at_version(2)
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, LeadStatus::Proposta);
        assert_eq!(updated.version, 2);
        assert_eq!(gateway.call_count(), 2);

        gateway.delete_lead(id).await.unwrap();
        assert!(gateway.lead(id).is_none());
    }

    #[tokio::test]
    async fn unknown_lead_update_is_a_sync_error() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .update_lead(Uuid::new_v4(), LeadChanges::at_version(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SyncError(_)));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let gateway = MemoryGateway::new();
        let id = Uuid::new_v4();
        let slot = EventSlot::new(NaiveDate::from_ymd_opt(2025, 1, 25).unwrap(), None);

        gateway.fail_next(1);
        assert!(gateway.reschedule_event(id, slot).await.is_err());
        assert!(gateway.reschedule_event(id, slot).await.is_ok());
        assert_eq!(gateway.event_slot(id), Some(slot));

        gateway.set_offline(true);
        assert!(gateway.reschedule_event(id, slot).await.is_err());
        assert_eq!(gateway.reschedules().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied_per_call() {
        let gateway = MemoryGateway::new();
        gateway.push_latency(Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        gateway.create_lead(Lead::from_new(NewLead::named("Ana"))).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
