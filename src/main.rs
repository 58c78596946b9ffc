//src/main.rs

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use pipeline_sync::{
    db::MemoryGateway,
    models::{
        calendar::{EventType, NewCalendarEvent},
        lead::{LeadStatus, NewLead},
    },
    services::notification_service::TracingNotifier,
    CrmSession, EngineConfig,
};

// Sessão de demonstração contra o backend em memória: cria leads, arrasta no
// funil, converte, reagenda e desfaz, e imprime o quadro final em JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG controla o nível)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!("✅ Configuração carregada (janela de undo: {:?})", config.undo_window);

    let gateway = Arc::new(MemoryGateway::new());
    let mut session = CrmSession::new(config, gateway.clone(), Arc::new(TracingNotifier));
    session.set_actor("demo");

    let maria = session.create_lead(NewLead {
        email: Some("maria@exemplo.com.br".into()),
        value: Some(Decimal::new(4_500_00, 2)),
        tags: vec!["indicação".into()],
        ..NewLead::named("Maria da Silva")
    })?;
    let acme = session.create_lead(NewLead {
        company: Some("ACME Ltda".into()),
        value: Some(Decimal::new(12_000_00, 2)),
        ..NewLead::named("ACME")
    })?;

    // Arrasta a Maria de "novo" para "qualificado"
    session.begin_drag(maria.id)?;
    session.drop_on(LeadStatus::Qualificado)?;

    // Primeira escrita do ACME falha: fica salvo localmente
    gateway.fail_next(1);
    session.move_lead(acme.id, LeadStatus::Proposta)?;
    session.convert_to_client(acme.id)?;

    let meeting = session.schedule_meeting(
        maria.id,
        NewCalendarEvent {
            title: "Apresentação da proposta".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap_or_default(),
            time: None,
            duration: 60,
            event_type: EventType::Meeting,
            lead_id: None,
            responsible: None,
        },
    )?;
    if let Some(new_date) = NaiveDate::from_ymd_opt(2025, 1, 25) {
        session.reschedule(meeting.id, new_date)?;
    }
    session.undo()?;

    // Dá tempo para as chamadas fire-and-forget voltarem
    tokio::time::sleep(Duration::from_millis(50)).await;
    for outcome in session.reconcile_pending() {
        tracing::debug!(?outcome, "Resposta conciliada");
    }

    println!("{}", serde_json::to_string_pretty(&session.pipeline_board())?);
    println!("{}", serde_json::to_string_pretty(&session.pipeline_summary())?);
    Ok(())
}
