// src/services/sync_service.rs

use std::{future::Future, sync::Arc};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PersistenceGateway,
    models::{
        calendar::{CalendarEvent, EventSlot},
        lead::{Lead, LeadChanges},
    },
};

// =========================================================================
//  RELATÓRIOS DE SINCRONIZAÇÃO
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Lead(Uuid),
    Event(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    CreateLead,
    UpdateLead,
    RescheduleEvent,
}

// O que volta de cada chamada fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub target: SyncTarget,
    pub operation: SyncOperation,
    // Versão local no momento do enfileiramento
    pub sent_version: u64,
    // Ok(versão que o backend devolveu, se devolveu) / Err(mensagem)
    pub result: Result<Option<u64>, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    // Backend confirmou a versão atual
    Confirmed,
    // Resposta de uma versão já superada: descartada
    Stale,
    // Backend diz conhecer versão mais nova que a enviada: ignorada, nunca sobrescreve
    RemoteAhead,
    // Falhou; estado local mantido
    Failed,
    // A entidade saiu da sessão antes da resposta chegar
    Orphaned,
}

// Entidades com contador de versão local.
pub trait Versioned {
    fn version(&self) -> u64;
    fn synced_version(&self) -> u64;
    fn set_synced_version(&mut self, version: u64);
}

impl Versioned for Lead {
    fn version(&self) -> u64 {
        self.version
    }
    fn synced_version(&self) -> u64 {
        self.synced_version
    }
    fn set_synced_version(&mut self, version: u64) {
        self.synced_version = version;
    }
}

impl Versioned for CalendarEvent {
    fn version(&self) -> u64 {
        self.version
    }
    fn synced_version(&self) -> u64 {
        self.synced_version
    }
    fn set_synced_version(&mut self, version: u64) {
        self.synced_version = version;
    }
}

/// Compara a resposta com o estado local. Só `Confirmed` muta algo
/// (avança `synced_version`, que nunca recua).
pub fn reconcile<T: Versioned>(entity: Option<&mut T>, report: &SyncReport) -> Reconciliation {
    let Some(entity) = entity else {
        tracing::debug!(target_entity = ?report.target, "Resposta para entidade fora da sessão; descartada");
        return Reconciliation::Orphaned;
    };

    // Só a versão atual pode confirmar. Enviada > atual acontece quando um
    // snapshot mais antigo substituiu a entidade no meio do caminho.
    if report.sent_version != entity.version() {
        tracing::debug!(
            target_entity = ?report.target,
            sent = report.sent_version,
            current = entity.version(),
            "Resposta antiga descartada"
        );
        return Reconciliation::Stale;
    }

    match &report.result {
        Ok(Some(remote)) if *remote > report.sent_version => {
            tracing::warn!(
                target_entity = ?report.target,
                sent = report.sent_version,
                remote,
                "Backend respondeu com versão mais nova que a enviada; resposta ignorada"
            );
            Reconciliation::RemoteAhead
        }
        Ok(_) => {
            if report.sent_version > entity.synced_version() {
                entity.set_synced_version(report.sent_version);
            }
            Reconciliation::Confirmed
        }
        Err(message) => {
            tracing::warn!(
                target_entity = ?report.target,
                operation = ?report.operation,
                "Falha ao sincronizar; estado local mantido: {}",
                message
            );
            Reconciliation::Failed
        }
    }
}

// =========================================================================
//  DESPACHANTE (FIRE-AND-FORGET)
// =========================================================================

/// Dispara as chamadas ao gateway em tasks separadas e devolve os
/// resultados por um canal. Nada aqui bloqueia a UI nem cancela chamadas.
#[derive(Clone)]
pub struct SyncDispatcher {
    gateway: Arc<dyn PersistenceGateway>,
    tx: mpsc::UnboundedSender<SyncReport>,
}

impl SyncDispatcher {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> (Self, mpsc::UnboundedReceiver<SyncReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { gateway, tx }, rx)
    }

    pub fn create_lead(&self, lead: Lead) {
        let gateway = Arc::clone(&self.gateway);
        let (id, version) = (lead.id, lead.version);
        self.spawn(SyncTarget::Lead(id), SyncOperation::CreateLead, version, async move {
            gateway.create_lead(lead).await.map(|stored| Some(stored.version))
        });
    }

    pub fn update_lead(&self, id: Uuid, changes: LeadChanges) {
        let gateway = Arc::clone(&self.gateway);
        let version = changes.version;
        self.spawn(SyncTarget::Lead(id), SyncOperation::UpdateLead, version, async move {
            gateway.update_lead(id, changes).await.map(|stored| Some(stored.version))
        });
    }

    pub fn reschedule_event(&self, id: Uuid, version: u64, slot: EventSlot) {
        let gateway = Arc::clone(&self.gateway);
        self.spawn(SyncTarget::Event(id), SyncOperation::RescheduleEvent, version, async move {
            gateway.reschedule_event(id, slot).await.map(|_| None)
        });
    }

    fn spawn<F>(&self, target: SyncTarget, operation: SyncOperation, sent_version: u64, call: F)
    where
        F: Future<Output = Result<Option<u64>, AppError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = async move {
            let result = call.await.map_err(|e| e.to_string());
            let report = SyncReport {
                target,
                operation,
                sent_version,
                result,
            };
            if tx.send(report).is_err() {
                tracing::debug!(target_entity = ?target, "Sessão encerrada antes da resposta");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                // Sem runtime não há rede: falha imediata, estado local mantido
                tracing::warn!(target_entity = ?target, "Sem runtime tokio; sincronização não enviada");
                let _ = self.tx.send(SyncReport {
                    target,
                    operation,
                    sent_version,
                    result: Err("sem runtime assíncrono".to_string()),
                });
            }
        }
    }
}
