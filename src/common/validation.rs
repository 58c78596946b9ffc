// src/common/validation.rs

use validator::ValidationError;

/// Texto obrigatório: só espaços conta como vazio, já que o valor é
/// gravado com `trim()`.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Campo obrigatório".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \t\n").is_err());
        assert!(validate_not_blank(" Ana ").is_ok());
    }
}
