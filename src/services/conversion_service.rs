// src/services/conversion_service.rs

use chrono::Utc;

use crate::{
    db::lead_store::next_version,
    models::lead::{Lead, LeadChanges, LeadStatus},
    services::{
        ledger_service::LedgerService,
        stage_service::{apply_transition, transition, SideEffect, StageEvent},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted { version: u64 },
    // Já era cliente: flags intocadas, sem entrada `conversion` duplicada.
    // `status_forced` indica se o status teve que voltar para `ganho`.
    AlreadyClient { status_forced: bool },
}

/// Conversão explícita lead → cliente, independente de onde o lead está no funil.
#[derive(Debug, Clone)]
pub struct ConversionService {
    ledger: LedgerService,
}

impl ConversionService {
    pub fn new(ledger: LedgerService) -> Self {
        Self { ledger }
    }

    pub fn convert(&self, lead: &mut Lead, author: &str) -> (ConversionOutcome, Option<LeadChanges>) {
        let already_client = lead.is_client;
        let mut transition = transition(lead.status, StageEvent::ConvertToClient);

        if already_client {
            // Guarda explícita contra o registro duplicado
            transition.effects.retain(|effect| *effect != SideEffect::RecordConversion);

            if !transition.changes_status() {
                tracing::debug!(lead_id = %lead.id, "Lead já é cliente e está em ganho; nada a fazer");
                return (ConversionOutcome::AlreadyClient { status_forced: false }, None);
            }
        }

        let appended = apply_transition(lead, &transition, &self.ledger, author, Utc::now());
        let version = next_version(lead);

        let mut changes = LeadChanges::lifecycle_of(lead);
        changes.new_interactions = appended;

        if already_client {
            tracing::info!(lead_id = %lead.id, from = %transition.from, version, "Cliente recolocado em ganho");
            return (ConversionOutcome::AlreadyClient { status_forced: true }, Some(changes));
        }

        tracing::info!(lead_id = %lead.id, from = %transition.from, version, "✅ Lead convertido em cliente");
        debug_assert_eq!(lead.status, LeadStatus::Ganho);
        (ConversionOutcome::Converted { version }, Some(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{interaction::InteractionType, lead::NewLead};

    fn service() -> ConversionService {
        ConversionService::new(LedgerService::new("sistema"))
    }

    fn count(lead: &Lead, kind: InteractionType) -> usize {
        lead.interactions.iter().filter(|i| i.kind == kind).count()
    }

    #[test]
    fn converts_from_any_stage() {
        let mut lead = Lead::from_new(NewLead::named("Empresa X"));
        lead.status = LeadStatus::Qualificado;

        let (outcome, changes) = service().convert(&mut lead, "ana");

        assert_eq!(outcome, ConversionOutcome::Converted { version: 1 });
        assert!(lead.is_client);
        assert_eq!(lead.status, LeadStatus::Ganho);
        assert!(lead.won_at.is_some());
        assert!(lead.converted_to_client_at.is_some());
        assert_eq!(count(&lead, InteractionType::StageChange), 1);
        assert_eq!(count(&lead, InteractionType::Conversion), 1);

        let changes = changes.unwrap();
        assert_eq!(changes.is_client, Some(true));
        assert_eq!(changes.new_interactions.len(), 2);
    }

    #[test]
    fn second_call_keeps_flags_and_ledger() {
        let service = service();
        let mut lead = Lead::from_new(NewLead::named("Empresa X"));

        service.convert(&mut lead, "ana");
        let converted_at = lead.converted_to_client_at;
        let entries = lead.interactions.len();

        let (outcome, changes) = service.convert(&mut lead, "ana");

        assert_eq!(outcome, ConversionOutcome::AlreadyClient { status_forced: false });
        assert!(changes.is_none());
        assert!(lead.is_client);
        assert_eq!(lead.converted_to_client_at, converted_at);
        assert_eq!(lead.interactions.len(), entries);
        assert_eq!(lead.version, 1);
    }

    #[test]
    fn already_client_outside_ganho_is_forced_back_without_new_conversion() {
        let service = service();
        let mut lead = Lead::from_new(NewLead::named("Empresa X"));
        service.convert(&mut lead, "ana");
        let won_at = lead.won_at;
        lead.status = LeadStatus::Negociacao;

        let (outcome, changes) = service.convert(&mut lead, "ana");

        assert_eq!(outcome, ConversionOutcome::AlreadyClient { status_forced: true });
        assert_eq!(lead.status, LeadStatus::Ganho);
        assert_eq!(lead.won_at, won_at);
        assert_eq!(count(&lead, InteractionType::Conversion), 1);
        assert_eq!(changes.unwrap().new_interactions.len(), 1);
    }
}
