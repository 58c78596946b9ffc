// src/session.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::EngineConfig,
    db::{lead_store::next_version, CalendarStore, LeadStore, PersistenceGateway},
    models::{
        calendar::{CalendarEvent, EventSlot, NewCalendarEvent},
        interaction::{Interaction, InteractionType, NewInteraction},
        lead::{
            ContactUpdate, Lead, LeadChanges, LeadDocument, LeadMessage, LeadStatus, MessageChannel,
            MessageDirection, NewDocument, NewLead, NewMessage, ScoreUpdate, Temperature,
        },
        pipeline::{PipelineSummary, StageColumn},
    },
    services::{
        conversion_service::{ConversionOutcome, ConversionService},
        ledger_service::LedgerService,
        notification_service::{Notification, NotificationSink},
        pipeline_service,
        reschedule_service::{RescheduleOutcome, RescheduleService, UndoOutcome, UndoToken},
        stage_service::{DragController, DragState, MoveOutcome, StageService},
        sync_service::{self, Reconciliation, SyncDispatcher, SyncReport, SyncTarget},
    },
};

/// A sessão do usuário: dona única dos stores de leads e eventos.
///
/// Toda mutação passa por aqui, é aplicada na hora (otimista) e só depois vira
/// uma chamada fire-and-forget ao gateway. As respostas voltam pelo canal de
/// `SyncReport` e são conciliadas por versão em [`CrmSession::reconcile`].
pub struct CrmSession {
    config: EngineConfig,
    // Quem está operando a UI (autor das entradas manuais do ledger)
    actor: String,

    leads: LeadStore,
    events: CalendarStore,

    ledger: LedgerService,
    stages: StageService,
    conversion: ConversionService,
    reschedule: RescheduleService,
    drag: DragController,

    sync: SyncDispatcher,
    reports: mpsc::UnboundedReceiver<SyncReport>,
    notifier: Arc<dyn NotificationSink>,
}

impl CrmSession {
    pub fn new(
        config: EngineConfig,
        gateway: Arc<dyn PersistenceGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let ledger = LedgerService::new(config.system_author.clone());
        let (sync, reports) = SyncDispatcher::new(gateway);

        Self {
            actor: config.system_author.clone(),
            leads: LeadStore::new(),
            events: CalendarStore::new(),
            stages: StageService::new(ledger.clone()),
            conversion: ConversionService::new(ledger.clone()),
            reschedule: RescheduleService::new(config.undo_window),
            drag: DragController::default(),
            ledger,
            sync,
            reports,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn set_actor(&mut self, actor: impl Into<String>) {
        self.actor = actor.into();
    }

    // =========================================================================
    //  1. LEITURA
    // =========================================================================

    pub fn lead(&self, id: Uuid) -> Option<&Lead> {
        self.leads.get(id)
    }

    pub fn leads(&self) -> impl Iterator<Item = &Lead> {
        self.leads.iter()
    }

    pub fn event(&self, id: Uuid) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    pub fn agenda(&self) -> Vec<&CalendarEvent> {
        self.events.agenda()
    }

    pub fn lead_events(&self, lead_id: Uuid) -> Vec<&CalendarEvent> {
        self.events.for_lead(lead_id)
    }

    /// Histórico do lead, mais recente primeiro.
    pub fn history(&self, lead_id: Uuid) -> Result<Vec<&Interaction>, AppError> {
        match self.leads.get(lead_id) {
            Some(lead) => Ok(LedgerService::history(lead)),
            None => {
                tracing::debug!(%lead_id, "Histórico pedido para lead fora da sessão");
                Err(AppError::LeadNotFound(lead_id))
            }
        }
    }

    pub fn pipeline_board(&self) -> Vec<StageColumn> {
        pipeline_service::board(&self.leads)
    }

    pub fn pipeline_summary(&self) -> PipelineSummary {
        pipeline_service::summary(&self.leads)
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    pub fn pending_undo(&self) -> Option<&UndoToken> {
        self.reschedule.pending_undo()
    }

    // =========================================================================
    //  2. CARGA / REMOÇÃO EXTERNA
    // =========================================================================

    /// Carrega um snapshot vindo do backend. O que veio de lá já está sincronizado.
    /// Entidades cuja versão local está à frente do snapshot são mantidas: a
    /// edição otimista ainda pendente não pode ser perdida.
    pub fn hydrate(&mut self, leads: Vec<Lead>, events: Vec<CalendarEvent>) {
        let (mut lead_count, mut event_count, mut kept) = (0, 0, 0);
        for mut lead in leads {
            if self.leads.get(lead.id).is_some_and(|local| local.version > lead.version) {
                tracing::debug!(lead_id = %lead.id, "Lead local mais novo que o snapshot; mantido");
                kept += 1;
                continue;
            }
            lead.synced_version = lead.version;
            self.leads.upsert(lead);
            lead_count += 1;
        }
        for mut event in events {
            if self.events.get(event.id).is_some_and(|local| local.version > event.version) {
                tracing::debug!(event_id = %event.id, "Evento local mais novo que o snapshot; mantido");
                kept += 1;
                continue;
            }
            event.synced_version = event.version;
            self.events.upsert(event);
            event_count += 1;
        }
        tracing::info!(leads = lead_count, events = event_count, kept, "Sessão hidratada");
    }

    /// Reflete uma exclusão feita fora do motor. Respostas pendentes desse
    /// lead passam a ser descartadas como órfãs.
    pub fn evict_lead(&mut self, lead_id: Uuid) -> Option<Lead> {
        if let DragState::Dragging { lead_id: dragging, .. } = self.drag.state() {
            if dragging == lead_id {
                self.drag.cancel();
            }
        }
        let removed = self.leads.remove(lead_id);
        if removed.is_some() {
            tracing::info!(%lead_id, "Lead removido da sessão");
        }
        removed
    }

    // =========================================================================
    //  3. CRIAÇÃO E EDIÇÃO DO LEAD
    // =========================================================================

    pub fn create_lead(&mut self, payload: NewLead) -> Result<Lead, AppError> {
        payload.validate()?;

        if let Some(existing) = payload.id.and_then(|id| self.leads.get(id)) {
            tracing::debug!(lead_id = %existing.id, "Lead já existe na sessão; criação ignorada");
            return Ok(existing.clone());
        }

        let mut lead = Lead::from_new(payload);
        self.ledger.append_system(&mut lead, InteractionType::System, "Lead criado");
        next_version(&mut lead);

        tracing::info!(lead_id = %lead.id, name = %lead.name, "Lead criado");
        self.leads.upsert(lead.clone());
        self.sync.create_lead(lead.clone());
        self.notifier.notify(Notification::success("Lead criado", lead.name.clone()));

        Ok(lead)
    }

    pub fn update_contact(&mut self, lead_id: Uuid, update: ContactUpdate) -> Result<u64, AppError> {
        update.validate()?;
        let lead = self.leads.get_mut(lead_id)?;
        if update.is_empty() {
            return Ok(lead.version);
        }

        if let Some(name) = &update.name {
            lead.name = name.trim().to_string();
        }
        if update.email.is_some() {
            lead.email = update.email.clone();
        }
        if update.phone.is_some() {
            lead.phone = update.phone.clone();
        }
        if update.company.is_some() {
            lead.company = update.company.clone();
        }
        if update.document_number.is_some() {
            lead.document_number = update.document_number.clone();
        }
        if let Some(value) = update.value {
            lead.value = value;
        }
        let version = next_version(lead);

        let changes = LeadChanges {
            name: update.name.map(|n| n.trim().to_string()),
            email: update.email,
            phone: update.phone,
            company: update.company,
            document_number: update.document_number,
            value: update.value,
            ..LeadChanges::at_version(version)
        };
        self.sync.update_lead(lead_id, changes);
        Ok(version)
    }

    /// Tags repetidas são ignoradas. Devolve quantas entraram.
    pub fn add_tags(&mut self, lead_id: Uuid, tags: &[String]) -> Result<usize, AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        let added = lead.add_tags(tags);
        if added == 0 {
            return Ok(0);
        }

        let version = next_version(lead);
        let changes = LeadChanges {
            tags: Some(lead.tags.clone()),
            ..LeadChanges::at_version(version)
        };
        self.sync.update_lead(lead_id, changes);
        Ok(added)
    }

    pub fn remove_tag(&mut self, lead_id: Uuid, tag: &str) -> Result<bool, AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        if !lead.remove_tag(tag) {
            return Ok(false);
        }

        let version = next_version(lead);
        let changes = LeadChanges {
            tags: Some(lead.tags.clone()),
            ..LeadChanges::at_version(version)
        };
        self.sync.update_lead(lead_id, changes);
        Ok(true)
    }

    pub fn set_temperature(&mut self, lead_id: Uuid, temperature: Temperature) -> Result<(), AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        if lead.temperature == temperature {
            return Ok(());
        }

        lead.temperature = temperature;
        let version = next_version(lead);
        self.sync.update_lead(
            lead_id,
            LeadChanges {
                temperature: Some(temperature),
                ..LeadChanges::at_version(version)
            },
        );
        Ok(())
    }

    pub fn set_score(&mut self, lead_id: Uuid, score: u8) -> Result<(), AppError> {
        ScoreUpdate { score }.validate()?;
        let lead = self.leads.get_mut(lead_id)?;
        if lead.score == score {
            return Ok(());
        }

        lead.score = score;
        let version = next_version(lead);
        self.sync.update_lead(
            lead_id,
            LeadChanges {
                score: Some(score),
                ..LeadChanges::at_version(version)
            },
        );
        Ok(())
    }

    // =========================================================================
    //  4. LEDGER E SUB-OPERAÇÕES
    // =========================================================================

    /// Registro manual (nota, ligação, e-mail, whatsapp, tarefa).
    pub fn log_interaction(&mut self, lead_id: Uuid, mut payload: NewInteraction) -> Result<Interaction, AppError> {
        payload.validate()?;
        let lead = self.leads.get_mut(lead_id)?;
        if payload.author.is_none() {
            payload.author = Some(self.actor.clone());
        }

        let entry = self.ledger.record(lead, payload);
        let version = next_version(lead);
        let changes = LeadChanges {
            last_contact_at: lead.last_contact_at,
            ..LeadChanges::at_version(version)
        }
        .with_interaction(entry.clone());

        self.sync.update_lead(lead_id, changes);
        Ok(entry)
    }

    pub fn attach_document(&mut self, lead_id: Uuid, payload: NewDocument) -> Result<LeadDocument, AppError> {
        payload.validate()?;
        let lead = self.leads.get_mut(lead_id)?;

        let document = LeadDocument {
            id: Uuid::new_v4(),
            name: payload.name,
            kind: payload.kind,
            size_bytes: payload.size_bytes,
            uploaded_by: payload.uploaded_by.unwrap_or_else(|| self.actor.clone()),
            uploaded_at: Utc::now(),
        };
        lead.documents.push(document.clone());

        let entry = Interaction::new(
            InteractionType::Document,
            format!("Documento anexado: {}", document.name),
            document.uploaded_by.as_str(),
        )
        .with_metadata(json!({ "documentId": document.id, "kind": document.kind }));
        let entry = self.ledger.append(lead, entry);
        let version = next_version(lead);

        let changes = LeadChanges {
            documents: Some(lead.documents.clone()),
            ..LeadChanges::at_version(version)
        }
        .with_interaction(entry);
        self.sync.update_lead(lead_id, changes);
        Ok(document)
    }

    /// Remove o documento. A entrada de upload no ledger continua lá.
    pub fn remove_document(&mut self, lead_id: Uuid, document_id: Uuid) -> Result<LeadDocument, AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        let Some(index) = lead.documents.iter().position(|d| d.id == document_id) else {
            tracing::debug!(%lead_id, %document_id, "Documento não encontrado; nada removido");
            return Err(AppError::DocumentNotFound(document_id));
        };

        let removed = lead.documents.remove(index);
        let version = next_version(lead);
        let changes = LeadChanges {
            documents: Some(lead.documents.clone()),
            ..LeadChanges::at_version(version)
        };
        self.sync.update_lead(lead_id, changes);
        Ok(removed)
    }

    pub fn record_message(&mut self, lead_id: Uuid, payload: NewMessage) -> Result<LeadMessage, AppError> {
        payload.validate()?;
        let lead = self.leads.get_mut(lead_id)?;

        let message = LeadMessage {
            id: Uuid::new_v4(),
            channel: payload.channel,
            direction: payload.direction,
            content: payload.content,
            sent_at: Utc::now(),
        };
        lead.messages.push(message.clone());

        let kind = match message.channel {
            MessageChannel::Whatsapp => InteractionType::Whatsapp,
            MessageChannel::Email => InteractionType::Email,
        };
        let summary = match message.direction {
            MessageDirection::Inbound => "Mensagem recebida",
            MessageDirection::Outbound => "Mensagem enviada",
        };
        let entry = Interaction::new(kind, format!("{}: {}", summary, message.content), self.actor.as_str())
            .with_metadata(json!({ "messageId": message.id, "direction": message.direction }));
        let entry = self.ledger.append(lead, entry);
        let version = next_version(lead);

        let mut changes = LeadChanges {
            last_contact_at: lead.last_contact_at,
            ..LeadChanges::at_version(version)
        }
        .with_interaction(entry);
        changes.new_messages.push(message.clone());
        self.sync.update_lead(lead_id, changes);
        Ok(message)
    }

    /// Cria um evento de calendário já vinculado ao lead.
    pub fn schedule_meeting(&mut self, lead_id: Uuid, mut payload: NewCalendarEvent) -> Result<CalendarEvent, AppError> {
        payload.validate()?;
        let lead = self.leads.get_mut(lead_id)?;

        payload.lead_id = Some(lead_id);
        if payload.responsible.is_none() {
            payload.responsible = Some(self.actor.clone());
        }
        let event = CalendarEvent::from(payload);
        lead.meetings.push(event.id);

        let entry = Interaction::new(
            InteractionType::Meeting,
            format!("Reunião agendada: {} em {}", event.title, event.slot()),
            self.actor.as_str(),
        )
        .with_metadata(json!({ "eventId": event.id, "date": event.date }));
        let entry = self.ledger.append(lead, entry);
        let version = next_version(lead);

        let changes = LeadChanges {
            meetings: Some(lead.meetings.clone()),
            last_contact_at: lead.last_contact_at,
            ..LeadChanges::at_version(version)
        }
        .with_interaction(entry);

        self.events.upsert(event.clone());
        self.sync.update_lead(lead_id, changes);
        Ok(event)
    }

    /// Evento avulso (sem lead). Criação de evento não tem chamada no gateway.
    pub fn add_event(&mut self, payload: NewCalendarEvent) -> Result<CalendarEvent, AppError> {
        payload.validate()?;
        if let Some(lead_id) = payload.lead_id {
            if !self.leads.contains(lead_id) {
                tracing::debug!(%lead_id, "Evento aponta para lead fora da sessão");
                return Err(AppError::LeadNotFound(lead_id));
            }
        }

        let event = CalendarEvent::from(payload);
        self.events.upsert(event.clone());
        Ok(event)
    }

    // =========================================================================
    //  5. FUNIL: MOVER, ARRASTAR, CONVERTER
    // =========================================================================

    pub fn move_lead(&mut self, lead_id: Uuid, target: LeadStatus) -> Result<MoveOutcome, AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        let (outcome, changes) = self.stages.move_lead(lead, target, &self.actor);

        if let (MoveOutcome::Moved { from, to, .. }, Some(changes)) = (outcome, changes) {
            let title = format!("{} movido", lead.name);
            self.sync.update_lead(lead_id, changes);
            self.notifier.notify(Notification::success(
                title,
                format!("{} → {}", from.label(), to.label()),
            ));
        }
        Ok(outcome)
    }

    pub fn begin_drag(&mut self, lead_id: Uuid) -> Result<(), AppError> {
        let origin = match self.leads.get(lead_id) {
            Some(lead) => lead.status,
            None => {
                tracing::debug!(%lead_id, "Arrasto de lead fora da sessão ignorado");
                return Err(AppError::LeadNotFound(lead_id));
            }
        };
        self.drag.begin(lead_id, origin);
        Ok(())
    }

    /// Soltar numa coluna. Soltar na coluna de origem é um drop no-op.
    pub fn drop_on(&mut self, target: LeadStatus) -> Result<Option<MoveOutcome>, AppError> {
        let Some(dropped) = self.drag.drop_on(target) else {
            tracing::debug!(stage = %target, "Drop sem arrasto ativo");
            return Ok(None);
        };
        self.move_lead(dropped.lead_id, dropped.target).map(Some)
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel()
    }

    pub fn convert_to_client(&mut self, lead_id: Uuid) -> Result<ConversionOutcome, AppError> {
        let lead = self.leads.get_mut(lead_id)?;
        let (outcome, changes) = self.conversion.convert(lead, &self.actor);

        if let ConversionOutcome::Converted { .. } = outcome {
            self.notifier.notify(Notification::success("Cliente convertido", lead.name.clone()));
        }
        if let Some(changes) = changes {
            self.sync.update_lead(lead_id, changes);
        }
        Ok(outcome)
    }

    // =========================================================================
    //  6. CALENDÁRIO: REAGENDAR / DESFAZER
    // =========================================================================

    /// Move o evento para outra data mantendo o horário.
    pub fn reschedule(&mut self, event_id: Uuid, new_date: NaiveDate) -> Result<RescheduleOutcome, AppError> {
        let time = match self.events.get(event_id) {
            Some(event) => event.time,
            None => {
                tracing::debug!(%event_id, "Reagendamento de evento fora da sessão ignorado");
                return Err(AppError::EventNotFound(event_id));
            }
        };
        self.reschedule_slot(event_id, EventSlot::new(new_date, time))
    }

    pub fn reschedule_slot(&mut self, event_id: Uuid, slot: EventSlot) -> Result<RescheduleOutcome, AppError> {
        let outcome = self.reschedule.reschedule(&mut self.events, event_id, slot)?;

        if let RescheduleOutcome::Rescheduled { to, version, .. } = outcome {
            self.sync.reschedule_event(event_id, version, to);
            self.notifier.notify(
                Notification::success("Evento reagendado", format!("Novo horário: {}", to)).with_undo(),
            );
        }
        Ok(outcome)
    }

    /// Desfaz o último reagendamento, se ainda estiver na janela.
    pub fn undo(&mut self) -> Result<UndoOutcome, AppError> {
        let outcome = self.reschedule.undo(&mut self.events)?;

        if let UndoOutcome::Reverted { event_id, restored, version } = outcome {
            // PATCH compensatório com o horário original
            self.sync.reschedule_event(event_id, version, restored);
            self.notifier.notify(Notification::success(
                "Reagendamento desfeito",
                format!("Horário restaurado: {}", restored),
            ));
        }
        Ok(outcome)
    }

    // =========================================================================
    //  7. CONCILIAÇÃO
    // =========================================================================

    pub fn reconcile(&mut self, report: SyncReport) -> Reconciliation {
        let outcome = match report.target {
            SyncTarget::Lead(id) => sync_service::reconcile(self.leads.find_mut(id), &report),
            SyncTarget::Event(id) => sync_service::reconcile(self.events.find_mut(id), &report),
        };

        if outcome == Reconciliation::Failed && self.config.notify_sync_failures {
            self.notifier.notify(Notification::warning(
                "Salvo localmente",
                "Não foi possível sincronizar agora; a alteração continua valendo neste dispositivo.",
            ));
        }
        outcome
    }

    /// Concilia tudo o que já chegou, sem esperar.
    pub fn reconcile_pending(&mut self) -> Vec<Reconciliation> {
        let mut outcomes = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            outcomes.push(self.reconcile(report));
        }
        outcomes
    }

    /// Espera a próxima resposta do backend e concilia.
    /// Sem chamada em andamento, fica esperando indefinidamente.
    pub async fn reconcile_next(&mut self) -> Option<Reconciliation> {
        let report = self.reports.recv().await?;
        Some(self.reconcile(report))
    }
}
