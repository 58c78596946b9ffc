// src/models/calendar.rs

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    Meeting,
    Call,
    Visit,
    Task,
    FollowUp,
}

// Data + hora de um evento. É o que o reagendamento move (e o undo devolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSlot {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl EventSlot {
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for EventSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "{} {}", self.date, time.format("%H:%M")),
            None => write!(f, "{}", self.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    // Em minutos
    pub duration: u32,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub lead_id: Option<Uuid>,
    pub responsible: Option<String>,

    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub synced_version: u64,
}

impl CalendarEvent {
    pub fn slot(&self) -> EventSlot {
        EventSlot::new(self.date, self.time)
    }

    pub fn set_slot(&mut self, slot: EventSlot) {
        self.date = slot.date;
        self.time = slot.time;
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendarEvent {
    #[validate(length(min = 1, message = "required"))]
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[validate(range(min = 1, message = "invalid_duration"))]
    pub duration: u32,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    pub lead_id: Option<Uuid>,
    pub responsible: Option<String>,
}

impl From<NewCalendarEvent> for CalendarEvent {
    fn from(payload: NewCalendarEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: payload.title,
            date: payload.date,
            time: payload.time,
            duration: payload.duration,
            event_type: payload.event_type,
            lead_id: payload.lead_id,
            responsible: payload.responsible,
            version: 0,
            synced_version: 0,
        }
    }
}
