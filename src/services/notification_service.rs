// src/services/notification_service.rs

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    // Falha "suave": o dado ficou salvo localmente
    Warning,
}

// O toast. Como exibir é problema da UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    // A UI mostra o botão "Desfazer"
    pub undoable: bool,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
            undoable: false,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            title: title.into(),
            message: message.into(),
            undoable: false,
        }
    }

    pub fn with_undo(mut self) -> Self {
        self.undoable = true;
        self
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink padrão: só registra no log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!(undoable = notification.undoable, "🔔 {}: {}", notification.title, notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!("⚠️ {}: {}", notification.title, notification.message)
            }
        }
    }
}

/// Guarda tudo em memória (testes, ou uma UI que faz polling).
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    items: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Esvazia e devolve o que acumulou.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn warnings(&self) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.level == NotificationLevel::Warning)
            .collect()
    }
}

impl NotificationSink for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_collects_and_drains() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::success("Lead movido", "Novo → Qualificado"));
        notifier.notify(Notification::warning("Salvo localmente", "sem conexão"));

        assert_eq!(notifier.warnings().len(), 1);
        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.all().is_empty());
    }

    #[test]
    fn undo_flag_is_opt_in() {
        assert!(!Notification::success("a", "b").undoable);
        assert!(Notification::success("a", "b").with_undo().undoable);
    }
}
