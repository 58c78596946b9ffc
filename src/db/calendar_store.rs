// src/db/calendar_store.rs

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{common::error::AppError, models::calendar::CalendarEvent};

#[derive(Debug, Default)]
pub struct CalendarStore {
    events: BTreeMap<Uuid, CalendarEvent>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&CalendarEvent> {
        self.events.get(&id)
    }

    /// Eventos em ordem cronológica (data, hora, título).
    pub fn agenda(&self) -> Vec<&CalendarEvent> {
        let mut agenda: Vec<&CalendarEvent> = self.events.values().collect();
        agenda.sort_by(|a, b| {
            (a.date, a.time, &a.title).cmp(&(b.date, b.time, &b.title))
        });
        agenda
    }

    pub fn for_lead(&self, lead_id: Uuid) -> Vec<&CalendarEvent> {
        self.agenda()
            .into_iter()
            .filter(|e| e.lead_id == Some(lead_id))
            .collect()
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Result<&mut CalendarEvent, AppError> {
        match self.events.get_mut(&id) {
            Some(event) => Ok(event),
            None => {
                tracing::debug!(event_id = %id, "Evento não está na sessão; operação ignorada");
                Err(AppError::EventNotFound(id))
            }
        }
    }

    pub(crate) fn find_mut(&mut self, id: Uuid) -> Option<&mut CalendarEvent> {
        self.events.get_mut(&id)
    }

    pub(crate) fn upsert(&mut self, event: CalendarEvent) {
        self.events.insert(event.id, event);
    }
}
