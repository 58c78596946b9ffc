// src/models/pipeline.rs

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::lead::LeadStatus;

// 1. Uma coluna do quadro (kanban)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub stage: LeadStatus,
    pub label: &'static str,
    pub lead_ids: Vec<Uuid>,
    pub count: usize,
    pub total_value: Decimal, // Soma do `value` dos leads da coluna
}

// 2. Resumo do funil (os cards do topo)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_leads: usize,
    pub open_leads: usize,
    pub open_value: Decimal,
    pub won_leads: usize,
    pub won_value: Decimal,
    pub lost_leads: usize,
    pub clients: usize,
    // ganhos / (ganhos + perdidos); None enquanto nada fechou
    pub conversion_rate: Option<Decimal>,
    // Leads com mutação local ainda não confirmada pelo backend
    pub pending_sync: usize,
}
