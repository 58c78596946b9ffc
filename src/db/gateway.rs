// src/db/gateway.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        calendar::EventSlot,
        lead::{Lead, LeadChanges},
    },
};

/// Contrato de persistência consumido pelo motor.
///
/// A implementação (HTTP, banco, fila...) fica fora deste crate. Qualquer
/// chamada pode falhar; o motor trata toda falha como "não fatal, mantém o
/// estado local". Os argumentos são owned porque cada chamada roda numa task
/// separada (fire-and-forget).
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Persiste um lead novo. O backend pode completar timestamps.
    async fn create_lead(&self, lead: Lead) -> Result<Lead, AppError>;

    /// Aplica um patch. A resposta carrega a versão que o backend conhece.
    async fn update_lead(&self, id: Uuid, changes: LeadChanges) -> Result<Lead, AppError>;

    async fn delete_lead(&self, id: Uuid) -> Result<(), AppError>;

    async fn reschedule_event(&self, id: Uuid, slot: EventSlot) -> Result<(), AppError>;
}
