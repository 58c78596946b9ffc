// src/services/reschedule_service.rs

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CalendarStore,
    models::calendar::EventSlot,
};

pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

// O único reagendamento que ainda pode ser desfeito.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoToken {
    pub event_id: Uuid,
    pub from: EventSlot,
    pub to: EventSlot,
    pub expires_at: Instant,
}

impl UndoToken {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleOutcome {
    Unchanged,
    Rescheduled { from: EventSlot, to: EventSlot, version: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    Reverted { event_id: Uuid, restored: EventSlot, version: u64 },
    NothingToUndo,
    Expired,
}

/// Reagendamento otimista com undo de um nível só.
///
/// O slot de undo é um buffer de tamanho 1: um novo reagendamento sobrescreve
/// o token anterior, mesmo dentro da janela.
#[derive(Debug)]
pub struct RescheduleService {
    window: Duration,
    slot: Option<UndoToken>,
}

impl RescheduleService {
    pub fn new(window: Duration) -> Self {
        Self { window, slot: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Token ainda válido, se houver. Token vencido é tratado como ausente.
    pub fn pending_undo(&self) -> Option<&UndoToken> {
        self.slot.as_ref().filter(|token| !token.is_expired(Instant::now()))
    }

    pub fn reschedule(
        &mut self,
        events: &mut CalendarStore,
        event_id: Uuid,
        to: EventSlot,
    ) -> Result<RescheduleOutcome, AppError> {
        let event = events.get_mut(event_id)?;

        let from = event.slot();
        if from == to {
            tracing::debug!(%event_id, slot = %to, "Evento já está nesse horário; nada a fazer");
            return Ok(RescheduleOutcome::Unchanged);
        }

        event.set_slot(to);
        event.version += 1;
        let version = event.version;

        if let Some(previous) = self.slot.replace(UndoToken {
            event_id,
            from,
            to,
            expires_at: Instant::now() + self.window,
        }) {
            tracing::debug!(previous = %previous.event_id, "Token de undo anterior sobrescrito");
        }

        tracing::info!(%event_id, %from, %to, version, "Evento reagendado (otimista)");
        Ok(RescheduleOutcome::Rescheduled { from, to, version })
    }

    /// Consome o token (sempre): devolve o evento ao horário de origem se ainda
    /// estiver dentro da janela.
    pub fn undo(&mut self, events: &mut CalendarStore) -> Result<UndoOutcome, AppError> {
        let Some(token) = self.slot.take() else {
            return Ok(UndoOutcome::NothingToUndo);
        };

        if token.is_expired(Instant::now()) {
            tracing::debug!(event_id = %token.event_id, "Janela de undo expirada");
            return Ok(UndoOutcome::Expired);
        }

        let event = events.get_mut(token.event_id)?;
        event.set_slot(token.from);
        event.version += 1;

        tracing::info!(event_id = %token.event_id, restored = %token.from, version = event.version, "Reagendamento desfeito");
        Ok(UndoOutcome::Reverted {
            event_id: token.event_id,
            restored: token.from,
            version: event.version,
        })
    }
}

impl Default for RescheduleService {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::calendar::{CalendarEvent, EventType, NewCalendarEvent};
    use chrono::NaiveDate;

    fn slot(day: u32) -> EventSlot {
        EventSlot::new(NaiveDate::from_ymd_opt(2025, 1, day).unwrap(), None)
    }

    fn store_with_event(day: u32) -> (CalendarStore, Uuid) {
        let event = CalendarEvent::from(NewCalendarEvent {
            title: "Reunião".into(),
            date: slot(day).date,
            time: None,
            duration: 60,
            event_type: EventType::Meeting,
            lead_id: None,
            responsible: None,
        });
        let id = event.id;
        let mut store = CalendarStore::new();
        store.upsert(event);
        (store, id)
    }

    #[tokio::test(start_paused = true)]
    async fn undo_within_window_restores_original_slot() {
        let (mut store, id) = store_with_event(20);
        let mut service = RescheduleService::default();

        service.reschedule(&mut store, id, slot(25)).unwrap();
        assert_eq!(store.get(id).unwrap().slot(), slot(25));
        assert!(service.pending_undo().is_some());

        tokio::time::advance(Duration::from_secs(4)).await;
        let outcome = service.undo(&mut store).unwrap();

        assert!(matches!(outcome, UndoOutcome::Reverted { restored, version: 2, .. } if restored == slot(20)));
        assert_eq!(store.get(id).unwrap().slot(), slot(20));
        assert_eq!(service.undo(&mut store).unwrap(), UndoOutcome::NothingToUndo);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_after_window_keeps_new_slot() {
        let (mut store, id) = store_with_event(20);
        let mut service = RescheduleService::default();

        service.reschedule(&mut store, id, slot(25)).unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(service.pending_undo().is_none());
        assert_eq!(service.undo(&mut store).unwrap(), UndoOutcome::Expired);
        assert_eq!(store.get(id).unwrap().slot(), slot(25));
    }

    #[tokio::test(start_paused = true)]
    async fn second_reschedule_overwrites_the_token() {
        let (mut store, id) = store_with_event(20);
        let mut service = RescheduleService::default();

        service.reschedule(&mut store, id, slot(25)).unwrap();
        service.reschedule(&mut store, id, slot(27)).unwrap();

        service.undo(&mut store).unwrap();
        // Volta só um nível
        assert_eq!(store.get(id).unwrap().slot(), slot(25));
        assert_eq!(service.undo(&mut store).unwrap(), UndoOutcome::NothingToUndo);
    }

    #[test]
    fn same_slot_is_a_no_op() {
        let (mut store, id) = store_with_event(20);
        let mut service = RescheduleService::new(Duration::from_secs(5));

        assert_eq!(service.reschedule(&mut store, id, slot(20)).unwrap(), RescheduleOutcome::Unchanged);
        assert_eq!(store.get(id).unwrap().version, 0);
        assert!(service.pending_undo().is_none());
    }

    #[test]
    fn unknown_event_is_not_found() {
        let mut store = CalendarStore::new();
        let mut service = RescheduleService::default();
        assert!(service.reschedule(&mut store, Uuid::new_v4(), slot(1)).unwrap_err().is_not_found());
    }
}
