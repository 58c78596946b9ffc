// src/services/ledger_service.rs

use std::cmp::Reverse;

use crate::models::{
    interaction::{Interaction, InteractionType, NewInteraction},
    lead::Lead,
};

/// Ledger de interações: histórico só-de-anexar de cada lead.
///
/// Nenhum método aqui altera ou remove uma entrada já anexada.
#[derive(Debug, Clone)]
pub struct LedgerService {
    system_author: String,
}

impl LedgerService {
    pub fn new(system_author: impl Into<String>) -> Self {
        Self {
            system_author: system_author.into(),
        }
    }

    pub fn system_author(&self) -> &str {
        &self.system_author
    }

    /// Anexa no fim (O(1)) e devolve uma cópia da entrada gravada.
    /// Contatos reais (ligação, e-mail, whatsapp, reunião) atualizam `lastContactAt`.
    pub fn append(&self, lead: &mut Lead, entry: Interaction) -> Interaction {
        if entry.kind.is_contact() {
            let newer = lead.last_contact_at.is_none_or(|last| entry.timestamp > last);
            if newer {
                lead.last_contact_at = Some(entry.timestamp);
            }
        }
        lead.interactions.push(entry.clone());
        entry
    }

    /// Entrada automática assinada pelo sistema.
    pub fn append_system(&self, lead: &mut Lead, kind: InteractionType, content: impl Into<String>) -> Interaction {
        let entry = Interaction::new(kind, content, self.system_author.as_str());
        self.append(lead, entry)
    }

    /// Registro manual (nota, ligação, tarefa...). Sem autor, assina o sistema.
    pub fn record(&self, lead: &mut Lead, payload: NewInteraction) -> Interaction {
        let author = payload.author.unwrap_or_else(|| self.system_author.clone());
        let mut entry = Interaction::new(payload.kind, payload.content, author);
        entry.metadata = payload.metadata;
        self.append(lead, entry)
    }

    /// Visão para a UI: mais recente primeiro. Não reordena o armazenado.
    pub fn history(lead: &Lead) -> Vec<&Interaction> {
        let mut view: Vec<&Interaction> = lead.interactions.iter().rev().collect();
        // Estável: empates ficam na ordem inversa de inserção
        view.sort_by_key(|entry| Reverse(entry.timestamp));
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::NewLead;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[test]
    fn append_never_touches_previous_entries() {
        let ledger = LedgerService::new("sistema");
        let mut lead = Lead::from_new(NewLead::named("Ana"));

        let first = ledger.append_system(&mut lead, InteractionType::System, "Lead criado");
        let snapshot = lead.interactions.clone();
        ledger.append_system(&mut lead, InteractionType::Note, "Cliente pediu retorno");

        assert_eq!(lead.interactions.len(), 2);
        assert_eq!(lead.interactions[..1], snapshot[..]);
        assert_eq!(lead.interactions[0].id, first.id);
        assert_eq!(first.author, "sistema");
    }

    #[test]
    fn contact_entries_refresh_last_contact() {
        let ledger = LedgerService::new("sistema");
        let mut lead = Lead::from_new(NewLead::named("Ana"));

        ledger.append_system(&mut lead, InteractionType::Note, "nota");
        assert!(lead.last_contact_at.is_none());

        let call = ledger.record(
            &mut lead,
            NewInteraction {
                kind: InteractionType::Call,
                content: "Ligação de 10 min".into(),
                author: Some("carla".into()),
                metadata: Some(json!({ "durationMin": 10 })),
            },
        );
        assert_eq!(lead.last_contact_at, Some(call.timestamp));
        assert_eq!(call.author, "carla");
        assert!(call.metadata.is_some());
    }

    #[test]
    fn history_is_reverse_chronological_without_reordering_storage() {
        let ledger = LedgerService::new("sistema");
        let mut lead = Lead::from_new(NewLead::named("Ana"));
        let now = Utc::now();

        let mut old = Interaction::new(InteractionType::Note, "antiga", "a");
        old.timestamp = now - Duration::hours(2);
        let mut new = Interaction::new(InteractionType::Note, "nova", "a");
        new.timestamp = now;
        // Hidratado fora de ordem
        ledger.append(&mut lead, new);
        ledger.append(&mut lead, old);

        let view: Vec<&str> = LedgerService::history(&lead)
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(view, ["nova", "antiga"]);
        assert_eq!(lead.interactions[0].content, "nova");
        assert_eq!(lead.interactions[1].content, "antiga");
    }
}
