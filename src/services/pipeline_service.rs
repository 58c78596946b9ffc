// src/services/pipeline_service.rs

use rust_decimal::Decimal;

use crate::{
    db::LeadStore,
    models::{
        lead::LeadStatus,
        pipeline::{PipelineSummary, StageColumn},
    },
};

/// Quadro do funil: uma coluna por etapa, na ordem de exibição.
pub fn board(leads: &LeadStore) -> Vec<StageColumn> {
    LeadStatus::ALL
        .iter()
        .map(|&stage| {
            let mut column = StageColumn {
                stage,
                label: stage.label(),
                lead_ids: Vec::new(),
                count: 0,
                total_value: Decimal::ZERO,
            };
            for lead in leads.iter().filter(|l| l.status == stage) {
                column.lead_ids.push(lead.id);
                column.total_value += lead.value;
            }
            column.count = column.lead_ids.len();
            column
        })
        .collect()
}

pub fn summary(leads: &LeadStore) -> PipelineSummary {
    let mut summary = PipelineSummary {
        total_leads: 0,
        open_leads: 0,
        open_value: Decimal::ZERO,
        won_leads: 0,
        won_value: Decimal::ZERO,
        lost_leads: 0,
        clients: 0,
        conversion_rate: None,
        pending_sync: 0,
    };

    for lead in leads.iter() {
        summary.total_leads += 1;
        match lead.status {
            LeadStatus::Ganho => {
                summary.won_leads += 1;
                summary.won_value += lead.value;
            }
            LeadStatus::Perdido => summary.lost_leads += 1,
            _ => {
                summary.open_leads += 1;
                summary.open_value += lead.value;
            }
        }
        if lead.is_client {
            summary.clients += 1;
        }
        if lead.has_pending_sync() {
            summary.pending_sync += 1;
        }
    }

    let closed = summary.won_leads + summary.lost_leads;
    if closed > 0 {
        let rate = Decimal::from(summary.won_leads) / Decimal::from(closed);
        summary.conversion_rate = Some(rate.round_dp(4));
    }

    summary
}
