// src/models/lead.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{common::validation::validate_not_blank, models::interaction::Interaction};

// --- ENUMS ---

// Pessoa Física / Pessoa Jurídica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadType {
    #[default]
    Pf,
    Pj,
}

// As colunas do funil. A ordem de `ALL` é a ordem de exibição no quadro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    Novo,
    Contatado,
    Qualificado,
    Proposta,
    Negociacao,
    Ganho,
    Perdido,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::Novo,
        LeadStatus::Contatado,
        LeadStatus::Qualificado,
        LeadStatus::Proposta,
        LeadStatus::Negociacao,
        LeadStatus::Ganho,
        LeadStatus::Perdido,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::Novo => "novo",
            LeadStatus::Contatado => "contatado",
            LeadStatus::Qualificado => "qualificado",
            LeadStatus::Proposta => "proposta",
            LeadStatus::Negociacao => "negociacao",
            LeadStatus::Ganho => "ganho",
            LeadStatus::Perdido => "perdido",
        }
    }

    /// Rótulo da coluna no quadro.
    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::Novo => "Novo",
            LeadStatus::Contatado => "Contatado",
            LeadStatus::Qualificado => "Qualificado",
            LeadStatus::Proposta => "Proposta",
            LeadStatus::Negociacao => "Negociação",
            LeadStatus::Ganho => "Ganho",
            LeadStatus::Perdido => "Perdido",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LeadStatus::Ganho | LeadStatus::Perdido)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperature {
    #[default]
    Cold,
    Warm,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageChannel {
    Whatsapp,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

// --- SUB-ENTIDADES ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDocument {
    pub id: Uuid,
    pub name: String,
    // Ex: "contrato", "proposta", "rg"
    pub kind: String,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMessage {
    pub id: Uuid,
    pub channel: MessageChannel,
    pub direction: MessageDirection,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

// --- LEAD (O Dado) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub document_number: Option<String>,
    pub source: Option<String>,

    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub status: LeadStatus,
    pub value: Decimal,

    // Conjunto ordenado: sem duplicatas, na ordem de inserção
    pub tags: Vec<String>,
    pub temperature: Temperature,
    pub score: u8,

    pub documents: Vec<LeadDocument>,
    // Só cresce (ledger de auditoria)
    pub interactions: Vec<Interaction>,
    pub messages: Vec<LeadMessage>,
    // IDs dos eventos de calendário vinculados
    pub meetings: Vec<Uuid>,

    pub is_client: bool,

    pub created_at: DateTime<Utc>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub first_contact_at: Option<DateTime<Utc>>,
    pub won_at: Option<DateTime<Utc>>,
    pub lost_at: Option<DateTime<Utc>>,
    pub converted_to_client_at: Option<DateTime<Utc>>,

    // Contador local monotônico, usado para descartar respostas antigas
    #[serde(default)]
    pub version: u64,
    // Maior versão já confirmada pelo backend
    #[serde(default)]
    pub synced_version: u64,
}

impl Lead {
    /// Monta o lead a partir do payload já validado. O ledger começa vazio;
    /// quem cria é responsável por semear a entrada `system`.
    pub fn from_new(payload: NewLead) -> Self {
        let now = Utc::now();
        let mut lead = Self {
            id: payload.id.unwrap_or_else(Uuid::new_v4),
            name: payload.name.trim().to_string(),
            email: payload.email,
            phone: payload.phone,
            company: payload.company,
            document_number: payload.document_number,
            source: payload.source,
            lead_type: payload.lead_type.unwrap_or_default(),
            status: LeadStatus::Novo,
            value: payload.value.unwrap_or(Decimal::ZERO),
            tags: Vec::new(),
            temperature: payload.temperature.unwrap_or_default(),
            score: payload.score.unwrap_or(0),
            documents: Vec::new(),
            interactions: Vec::new(),
            messages: Vec::new(),
            meetings: Vec::new(),
            is_client: false,
            created_at: now,
            last_contact_at: None,
            first_contact_at: None,
            won_at: None,
            lost_at: None,
            converted_to_client_at: None,
            version: 0,
            synced_version: 0,
        };
        lead.add_tags(&payload.tags);
        lead
    }

    /// Insere as tags ignorando vazias e repetidas. Retorna quantas entraram.
    pub fn add_tags(&mut self, tags: &[String]) -> usize {
        let mut added = 0;
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() || self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                continue;
            }
            self.tags.push(tag.to_string());
            added += 1;
        }
        added
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| !t.eq_ignore_ascii_case(tag.trim()));
        self.tags.len() != before
    }

    pub fn has_pending_sync(&self) -> bool {
        self.synced_version < self.version
    }
}

// --- PAYLOADS ---

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_value");
        err.message = Some("O valor não pode ser negativo".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    // Opcional: o cliente pode gerar o ID para o backend reutilizar
    pub id: Option<Uuid>,

    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub document_number: Option<String>,
    pub source: Option<String>,

    #[serde(rename = "type")]
    pub lead_type: Option<LeadType>,

    #[validate(custom(function = "validate_non_negative"))]
    pub value: Option<Decimal>,

    #[serde(default)]
    pub tags: Vec<String>,
    pub temperature: Option<Temperature>,

    #[validate(range(min = 0, max = 100, message = "invalid_score"))]
    pub score: Option<u8>,
}

impl NewLead {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// Edição dos campos de contato. `None` = não mexe no campo.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub document_number: Option<String>,

    #[validate(custom(function = "validate_non_negative"))]
    pub value: Option<Decimal>,
}

impl ContactUpdate {
    /// Nenhum campo preenchido: não há o que aplicar.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.document_number.is_none()
            && self.value.is_none()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct ScoreUpdate {
    #[validate(range(min = 0, max = 100, message = "invalid_score"))]
    pub score: u8,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub kind: String,
    pub size_bytes: u64,
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub channel: MessageChannel,
    pub direction: MessageDirection,
    #[validate(length(min = 1, message = "required"))]
    pub content: String,
}

// --- PATCH PARA O BACKEND ---

// O que vai no `updateLead`. Sempre carrega a versão do momento do enfileiramento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadChanges {
    pub version: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_client: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<LeadDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meetings: Option<Vec<Uuid>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_contact_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub won_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_to_client_at: Option<DateTime<Utc>>,

    // Entradas do ledger criadas por esta mutação (o backend só anexa)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_interactions: Vec<Interaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_messages: Vec<LeadMessage>,
}

impl LeadChanges {
    pub fn at_version(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Campos de ciclo de vida (status + carimbos) lidos do estado atual do lead.
    pub fn lifecycle_of(lead: &Lead) -> Self {
        Self {
            version: lead.version,
            status: Some(lead.status),
            is_client: Some(lead.is_client),
            first_contact_at: lead.first_contact_at,
            won_at: lead.won_at,
            lost_at: lead.lost_at,
            converted_to_client_at: lead.converted_to_client_at,
            ..Default::default()
        }
    }

    pub fn with_interaction(mut self, entry: Interaction) -> Self {
        self.new_interactions.push(entry);
        self
    }

    /// Aplica o patch em uma cópia do lead (lado do backend).
    /// Carimbos de data e `isClient` mantêm a regra "primeira escrita vence".
    pub fn apply_to(&self, lead: &mut Lead) {
        lead.version = lead.version.max(self.version);

        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(email) = &self.email {
            lead.email = Some(email.clone());
        }
        if let Some(phone) = &self.phone {
            lead.phone = Some(phone.clone());
        }
        if let Some(company) = &self.company {
            lead.company = Some(company.clone());
        }
        if let Some(document_number) = &self.document_number {
            lead.document_number = Some(document_number.clone());
        }
        if let Some(value) = self.value {
            lead.value = value;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if self.is_client == Some(true) {
            lead.is_client = true;
        }
        if let Some(tags) = &self.tags {
            lead.tags = tags.clone();
        }
        if let Some(temperature) = self.temperature {
            lead.temperature = temperature;
        }
        if let Some(score) = self.score {
            lead.score = score;
        }
        if let Some(documents) = &self.documents {
            lead.documents = documents.clone();
        }
        if let Some(meetings) = &self.meetings {
            lead.meetings = meetings.clone();
        }
        if self.last_contact_at.is_some() {
            lead.last_contact_at = self.last_contact_at;
        }
        lead.first_contact_at = lead.first_contact_at.or(self.first_contact_at);
        lead.won_at = lead.won_at.or(self.won_at);
        lead.lost_at = lead.lost_at.or(self.lost_at);
        lead.converted_to_client_at = lead.converted_to_client_at.or(self.converted_to_client_at);

        for entry in &self.new_interactions {
            if !lead.interactions.iter().any(|i| i.id == entry.id) {
                lead.interactions.push(entry.clone());
            }
        }
        for message in &self.new_messages {
            if !lead.messages.iter().any(|m| m.id == message.id) {
                lead.messages.push(message.clone());
            }
        }
    }
}
