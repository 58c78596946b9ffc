// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;

use crate::services::reschedule_service::DEFAULT_UNDO_WINDOW;

// Configuração do motor, lida do ambiente (.env)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Quanto tempo o "Desfazer" de um reagendamento fica disponível
    pub undo_window: Duration,
    // Autor das entradas automáticas do ledger
    pub system_author: String,
    // Exibe o toast "salvo localmente" quando o backend falha
    pub notify_sync_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_window: DEFAULT_UNDO_WINDOW,
            system_author: "sistema".to_string(),
            notify_sync_failures: true,
        }
    }
}

impl EngineConfig {
    // A assinatura retorna um Result: variável presente mas inválida é erro
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let undo_window = match env::var("CRM_UNDO_WINDOW_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("CRM_UNDO_WINDOW_SECS inválido: {:?}", raw))?;
                Duration::from_secs(secs)
            }
            Err(_) => defaults.undo_window,
        };

        let system_author = env::var("CRM_SYSTEM_AUTHOR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.system_author);

        let notify_sync_failures = match env::var("CRM_NOTIFY_SYNC_FAILURES") {
            Ok(raw) => parse_flag(&raw)
                .with_context(|| format!("CRM_NOTIFY_SYNC_FAILURES inválido: {:?}", raw))?,
            Err(_) => defaults.notify_sync_failures,
        };

        tracing::debug!(?undo_window, %system_author, notify_sync_failures, "Configuração carregada");

        Ok(Self {
            undo_window,
            system_author,
            notify_sync_failures,
        })
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "sim" | "on" => Ok(true),
        "0" | "false" | "no" | "nao" | "não" | "off" => Ok(false),
        other => anyhow::bail!("valor booleano desconhecido: {}", other),
    }
}
