// src/services/stage_service.rs

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::lead_store::next_version,
    models::{
        interaction::{Interaction, InteractionType},
        lead::{Lead, LeadChanges, LeadStatus},
    },
    services::ledger_service::LedgerService,
};

// =========================================================================
//  1. TABELA DE TRANSIÇÃO
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    MoveTo(LeadStatus),
    ConvertToClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    StampFirstContact,
    StampWon,
    MarkClient,
    StampConverted,
    StampLost,
    RecordStageChange { from: LeadStatus, to: LeadStatus },
    RecordConversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: LeadStatus,
    pub to: LeadStatus,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

// Efeitos de ENTRAR numa etapa. Qualquer etapa aceita qualquer origem.
fn entry_effects(to: LeadStatus) -> &'static [SideEffect] {
    match to {
        LeadStatus::Contatado => &[SideEffect::StampFirstContact],
        LeadStatus::Ganho => &[SideEffect::StampWon, SideEffect::MarkClient, SideEffect::StampConverted],
        LeadStatus::Perdido => &[SideEffect::StampLost],
        LeadStatus::Novo | LeadStatus::Qualificado | LeadStatus::Proposta | LeadStatus::Negociacao => &[],
    }
}

/// `(etapa atual, evento) -> (etapa final, efeitos)`.
/// Mover para a própria etapa não gera efeito nenhum.
pub fn transition(from: LeadStatus, event: StageEvent) -> Transition {
    let to = match event {
        StageEvent::MoveTo(target) => target,
        StageEvent::ConvertToClient => LeadStatus::Ganho,
    };

    let mut effects = Vec::new();
    if from != to {
        effects.push(SideEffect::RecordStageChange { from, to });
        effects.extend_from_slice(entry_effects(to));
    }

    if event == StageEvent::ConvertToClient {
        for effect in [SideEffect::MarkClient, SideEffect::StampConverted, SideEffect::RecordConversion] {
            if !effects.contains(&effect) {
                effects.push(effect);
            }
        }
    }

    Transition { from, to, effects }
}

// =========================================================================
//  2. APLICAÇÃO DOS EFEITOS
// =========================================================================

/// Aplica status + efeitos no lead. Todos os carimbos seguem
/// "primeira escrita vence". Devolve as entradas anexadas ao ledger.
pub(crate) fn apply_transition(
    lead: &mut Lead,
    transition: &Transition,
    ledger: &LedgerService,
    author: &str,
    now: DateTime<Utc>,
) -> Vec<Interaction> {
    lead.status = transition.to;
    let mut appended = Vec::new();

    for effect in &transition.effects {
        match *effect {
            SideEffect::StampFirstContact => {
                lead.first_contact_at.get_or_insert(now);
            }
            SideEffect::StampWon => {
                lead.won_at.get_or_insert(now);
            }
            SideEffect::MarkClient => {
                lead.is_client = true;
            }
            SideEffect::StampConverted => {
                lead.converted_to_client_at.get_or_insert(now);
            }
            SideEffect::StampLost => {
                lead.lost_at.get_or_insert(now);
            }
            SideEffect::RecordStageChange { from, to } => {
                let entry = Interaction::new(
                    InteractionType::StageChange,
                    format!("Etapa alterada de {} para {}", from.label(), to.label()),
                    author,
                )
                .with_metadata(json!({ "from": from, "to": to }));
                appended.push(ledger.append(lead, entry));
            }
            SideEffect::RecordConversion => {
                let entry = Interaction::new(InteractionType::Conversion, "Lead convertido em cliente", author)
                    .with_metadata(json!({ "leadName": lead.name }));
                appended.push(ledger.append(lead, entry));
            }
        }
    }

    appended
}

// =========================================================================
//  3. CONTROLADOR DE ETAPAS
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    // Alvo == etapa atual: nada muda, nada vai para a rede
    Unchanged,
    Moved { from: LeadStatus, to: LeadStatus, version: u64 },
}

#[derive(Debug, Clone)]
pub struct StageService {
    ledger: LedgerService,
}

impl StageService {
    pub fn new(ledger: LedgerService) -> Self {
        Self { ledger }
    }

    /// Movimento otimista. Devolve o patch a enviar (já com a versão nova)
    /// ou `None` quando é no-op.
    pub fn move_lead(&self, lead: &mut Lead, target: LeadStatus, author: &str) -> (MoveOutcome, Option<LeadChanges>) {
        let transition = transition(lead.status, StageEvent::MoveTo(target));
        if !transition.changes_status() {
            tracing::debug!(lead_id = %lead.id, stage = %target, "Lead já está na etapa; nada a fazer");
            return (MoveOutcome::Unchanged, None);
        }

        let appended = apply_transition(lead, &transition, &self.ledger, author, Utc::now());
        let version = next_version(lead);

        tracing::info!(
            lead_id = %lead.id,
            from = %transition.from,
            to = %transition.to,
            version,
            "Lead movido (otimista)"
        );

        let mut changes = LeadChanges::lifecycle_of(lead);
        changes.new_interactions = appended;
        (
            MoveOutcome::Moved {
                from: transition.from,
                to: transition.to,
                version,
            },
            Some(changes),
        )
    }
}

// =========================================================================
//  4. ARRASTAR-E-SOLTAR
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { lead_id: Uuid, origin: LeadStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedLead {
    pub lead_id: Uuid,
    pub origin: LeadStatus,
    pub target: LeadStatus,
}

// idle -> dragging -> (dropped | cancelled) -> idle
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Começar outro arrasto com um já ativo substitui o anterior.
    pub fn begin(&mut self, lead_id: Uuid, origin: LeadStatus) {
        if let DragState::Dragging { lead_id: previous, .. } = self.state {
            tracing::debug!(%previous, "Arrasto anterior descartado");
        }
        self.state = DragState::Dragging { lead_id, origin };
    }

    /// Soltar volta para `Idle`. Sem arrasto ativo não há drop.
    pub fn drop_on(&mut self, target: LeadStatus) -> Option<DroppedLead> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { lead_id, origin } => Some(DroppedLead { lead_id, origin, target }),
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.state != DragState::Idle;
        self.state = DragState::Idle;
        was_dragging
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::NewLead;

    fn service() -> StageService {
        StageService::new(LedgerService::new("sistema"))
    }

    fn stage_changes(lead: &Lead) -> usize {
        lead.interactions
            .iter()
            .filter(|i| i.kind == InteractionType::StageChange)
            .count()
    }

    #[test]
    fn table_has_no_effects_for_self_moves() {
        for stage in LeadStatus::ALL {
            let t = transition(stage, StageEvent::MoveTo(stage));
            assert!(!t.changes_status());
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn table_allows_every_pair() {
        for from in LeadStatus::ALL {
            for to in LeadStatus::ALL.into_iter().filter(|to| *to != from) {
                let t = transition(from, StageEvent::MoveTo(to));
                assert_eq!(t.to, to);
                assert_eq!(t.effects[0], SideEffect::RecordStageChange { from, to });
            }
        }
    }

    #[test]
    fn conversion_from_ganho_only_records_conversion() {
        let t = transition(LeadStatus::Ganho, StageEvent::ConvertToClient);
        assert_eq!(
            t.effects,
            vec![SideEffect::MarkClient, SideEffect::StampConverted, SideEffect::RecordConversion]
        );

        let t = transition(LeadStatus::Proposta, StageEvent::ConvertToClient);
        assert_eq!(t.to, LeadStatus::Ganho);
        assert!(t.effects.contains(&SideEffect::StampWon));
        assert_eq!(t.effects.iter().filter(|e| **e == SideEffect::MarkClient).count(), 1);
    }

    #[test]
    fn every_distinct_move_appends_exactly_one_stage_change() {
        let service = service();
        for from in LeadStatus::ALL {
            for to in LeadStatus::ALL.into_iter().filter(|to| *to != from) {
                let mut lead = Lead::from_new(NewLead::named("X"));
                lead.status = from;

                let (outcome, changes) = service.move_lead(&mut lead, to, "ana");

                assert_eq!(outcome, MoveOutcome::Moved { from, to, version: 1 });
                assert_eq!(lead.status, to);
                assert_eq!(stage_changes(&lead), 1);
                let changes = changes.unwrap();
                assert_eq!(changes.version, 1);
                assert_eq!(changes.status, Some(to));
            }
        }
    }

    #[test]
    fn move_to_same_stage_is_a_no_op() {
        let service = service();
        let mut lead = Lead::from_new(NewLead::named("X"));

        let (outcome, changes) = service.move_lead(&mut lead, LeadStatus::Novo, "ana");

        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert!(changes.is_none());
        assert!(lead.interactions.is_empty());
        assert_eq!(lead.version, 0);
    }

    #[test]
    fn won_and_contact_stamps_are_first_write_wins() {
        let service = service();
        let mut lead = Lead::from_new(NewLead::named("X"));

        service.move_lead(&mut lead, LeadStatus::Contatado, "ana");
        let first_contact = lead.first_contact_at;
        service.move_lead(&mut lead, LeadStatus::Ganho, "ana");
        let (won_at, converted_at) = (lead.won_at, lead.converted_to_client_at);
        assert!(lead.is_client);

        service.move_lead(&mut lead, LeadStatus::Perdido, "ana");
        let lost_at = lead.lost_at;
        service.move_lead(&mut lead, LeadStatus::Contatado, "ana");
        service.move_lead(&mut lead, LeadStatus::Ganho, "ana");
        service.move_lead(&mut lead, LeadStatus::Perdido, "ana");

        assert!(first_contact.is_some() && lost_at.is_some());
        assert_eq!(lead.first_contact_at, first_contact);
        assert_eq!(lead.won_at, won_at);
        assert_eq!(lead.converted_to_client_at, converted_at);
        assert_eq!(lead.lost_at, lost_at);
        // isClient nunca volta para false
        assert!(lead.is_client);
        assert_eq!(lead.version, 6);
        assert_eq!(stage_changes(&lead), 6);
    }

    #[test]
    fn drag_state_machine() {
        let mut drag = DragController::default();
        let lead_id = Uuid::new_v4();

        assert_eq!(drag.drop_on(LeadStatus::Ganho), None);
        assert!(!drag.cancel());

        drag.begin(lead_id, LeadStatus::Novo);
        assert_eq!(drag.state(), DragState::Dragging { lead_id, origin: LeadStatus::Novo });
        assert!(drag.cancel());
        assert_eq!(drag.state(), DragState::Idle);

        drag.begin(lead_id, LeadStatus::Novo);
        let other = Uuid::new_v4();
        drag.begin(other, LeadStatus::Proposta);
        let dropped = drag.drop_on(LeadStatus::Proposta).unwrap();
        assert_eq!(dropped.lead_id, other);
        assert_eq!(dropped.origin, dropped.target);
        assert_eq!(drag.state(), DragState::Idle);
    }
}
