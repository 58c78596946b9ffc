// src/models/interaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::validate_not_blank;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Note,
    Call,
    Email,
    Meeting,
    Whatsapp,
    StageChange,
    Document,
    Conversion,
    Task,
    System,
}

impl InteractionType {
    /// Tipos que contam como contato real com o lead (atualizam `lastContactAt`).
    pub fn is_contact(self) -> bool {
        matches!(
            self,
            InteractionType::Call
                | InteractionType::Email
                | InteractionType::Meeting
                | InteractionType::Whatsapp
        )
    }

    /// Tipos que o usuário pode registrar à mão. Os demais são do motor
    /// (mudança de etapa, conversão, documento, reunião, sistema).
    pub fn is_manual(self) -> bool {
        matches!(
            self,
            InteractionType::Note
                | InteractionType::Call
                | InteractionType::Email
                | InteractionType::Whatsapp
                | InteractionType::Task
        )
    }
}

fn validate_manual_kind(kind: &InteractionType) -> Result<(), ValidationError> {
    if kind.is_manual() {
        return Ok(());
    }
    let mut err = ValidationError::new("not_manual");
    err.message = Some("Tipo de interação reservado ao sistema".into());
    Err(err)
}

// --- ENTRADA DO LEDGER ---

// Uma vez anexada, a entrada nunca muda: id e timestamp são imutáveis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub content: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,

    // Dados livres (ex: { "from": "novo", "to": "qualificado" })
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Interaction {
    pub fn new(kind: InteractionType, content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            author: author.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// Payload para registrar uma interação manual (nota, ligação, tarefa...)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInteraction {
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_manual_kind"))]
    pub kind: InteractionType,
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
    pub author: Option<String>,
    pub metadata: Option<Value>,
}
