// src/db/lead_store.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{common::error::AppError, models::lead::Lead};

// Coleção canônica dos leads da sessão. Só a sessão muta: ninguém de fora
// recebe `&mut`.
#[derive(Debug, Default)]
pub struct LeadStore {
    leads: HashMap<Uuid, Lead>,
    // Ordem de inserção, para o quadro ficar estável entre renderizações
    order: Vec<Uuid>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.leads.contains_key(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Lead> {
        self.leads.get(&id)
    }

    /// Leads na ordem em que entraram na sessão.
    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.order.iter().filter_map(|id| self.leads.get(id))
    }

    /// Busca para mutação. ID ausente vira `LeadNotFound` com log de debug.
    pub(crate) fn get_mut(&mut self, id: Uuid) -> Result<&mut Lead, AppError> {
        match self.leads.get_mut(&id) {
            Some(lead) => Ok(lead),
            None => {
                tracing::debug!(lead_id = %id, "Lead não está na sessão; operação ignorada");
                Err(AppError::LeadNotFound(id))
            }
        }
    }

    /// Como `get_mut`, mas sem log: para quem só confere se o lead ainda existe.
    pub(crate) fn find_mut(&mut self, id: Uuid) -> Option<&mut Lead> {
        self.leads.get_mut(&id)
    }

    /// Insere ou substitui (hidratação). Substituir não muda a posição.
    pub(crate) fn upsert(&mut self, lead: Lead) {
        if !self.leads.contains_key(&lead.id) {
            self.order.push(lead.id);
        }
        self.leads.insert(lead.id, lead);
    }

    pub(crate) fn remove(&mut self, id: Uuid) -> Option<Lead> {
        let removed = self.leads.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(removed)
    }
}

/// Avança a versão local do lead e devolve o novo valor.
pub(crate) fn next_version(lead: &mut Lead) -> u64 {
    lead.version += 1;
    lead.version
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::NewLead;

    #[test]
    fn keeps_insertion_order_across_replacements() {
        let mut store = LeadStore::new();
        let a = Lead::from_new(NewLead::named("A"));
        let b = Lead::from_new(NewLead::named("B"));
        let (a_id, b_id) = (a.id, b.id);

        store.upsert(a.clone());
        store.upsert(b);
        store.upsert(Lead {
            name: "A2".into(),
            ..a
        });

        let names: Vec<&str> = store.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["A2", "B"]);

        assert!(store.remove(a_id).is_some());
        assert_eq!(store.iter().map(|l| l.id).collect::<Vec<_>>(), vec![b_id]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_lead_is_not_found() {
        let mut store = LeadStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get_mut(id), Err(AppError::LeadNotFound(missing)) if missing == id));
    }

    #[test]
    fn versions_are_monotonic() {
        let mut lead = Lead::from_new(NewLead::named("C"));
        assert_eq!(next_version(&mut lead), 1);
        assert_eq!(next_version(&mut lead), 2);
    }
}
