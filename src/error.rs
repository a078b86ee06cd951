use thiserror::Error;

/// Errors raised by number generation, evaluation and history storage.
///
/// Every variant is recoverable at the call site. Input variants are
/// produced by the validation gate before any generation starts.
#[derive(Debug, Error)]
pub enum LottoError {
    #[error("invalid birth date: {0}")]
    InvalidBirthDate(String),
    #[error("invalid gender: {0}")]
    InvalidGender(String),
    #[error("invalid winning numbers: {0}")]
    InvalidTarget(String),
    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),
    #[error("invalid number set: {0}")]
    InvalidNumberSet(String),
    /// The sampler could not fill six slots within its draw budget.
    #[error("could not fill 6 numbers after {attempts} draws ({available} numbers available)")]
    ConstraintExhausted { attempts: usize, available: usize },
    #[error("invalid draw data: {0}")]
    InvalidDrawData(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LottoError {
    /// True for errors caused by caller input rather than storage or data.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            LottoError::InvalidBirthDate(_)
                | LottoError::InvalidGender(_)
                | LottoError::InvalidTarget(_)
                | LottoError::InvalidConstraints(_)
                | LottoError::InvalidNumberSet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LottoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_name_the_failure() {
        let err = LottoError::ConstraintExhausted {
            attempts: 1000,
            available: 5,
        };
        assert_eq!(
            err.to_string(),
            "could not fill 6 numbers after 1000 draws (5 numbers available)"
        );
        assert_eq!(
            LottoError::InvalidGender("x".to_string()).to_string(),
            "invalid gender: x"
        );
    }

    #[test]
    fn wrapped_errors_convert_and_keep_their_source() {
        let json: LottoError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(json, LottoError::Serialization(_)));
        assert!(json.source().is_some());
        assert!(!json.is_invalid_input());

        let sql: LottoError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(sql, LottoError::Storage(_)));
        assert!(sql.to_string().starts_with("storage error: "));
        assert!(LottoError::InvalidTarget(String::new()).source().is_none());
    }
}
