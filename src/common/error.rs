// src/common/error.rs

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    // Mutação local rejeitada ANTES de qualquer aplicação otimista.
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // A chamada ao backend falhou depois que a mutação local já foi aplicada.
    // Não é fatal: o estado local continua valendo.
    #[error("Falha de sincronização: {0}")]
    SyncError(String),

    #[error("Lead não encontrado: {0}")]
    LeadNotFound(Uuid),

    #[error("Evento não encontrado: {0}")]
    EventNotFound(Uuid),

    #[error("Documento não encontrado: {0}")]
    DocumentNotFound(Uuid),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Erros de "alvo sumiu" viram no-op com log de debug, nunca crash.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::LeadNotFound(_) | AppError::EventNotFound(_) | AppError::DocumentNotFound(_)
        )
    }

    /// Achata os detalhes da validação em `campo -> [códigos]`, para a UI exibir.
    pub fn validation_details(&self) -> Option<HashMap<String, Vec<String>>> {
        let AppError::ValidationError(errors) = self else {
            return None;
        };

        let mut details = HashMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            details.insert(field.to_string(), messages);
        }
        Some(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    #[test]
    fn validation_details_lists_codes_per_field() {
        let err: AppError = Payload { name: String::new() }.validate().unwrap_err().into();

        let details = err.validation_details().unwrap();
        assert_eq!(details.get("name"), Some(&vec!["required".to_string()]));
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_variants_are_flagged() {
        assert!(AppError::LeadNotFound(Uuid::new_v4()).is_not_found());
        assert!(AppError::EventNotFound(Uuid::new_v4()).is_not_found());
        assert!(!AppError::SyncError("timeout".into()).is_not_found());
        assert!(AppError::SyncError("timeout".into()).validation_details().is_none());
    }
}
