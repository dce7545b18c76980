use thiserror::Error;

use crate::config::ConfigError;
use crate::slot::SlotError;

pub type SessionResult<T> = Result<T, SessionError>;

/// Session lifecycle failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No directory entry matched both email and password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The persisted slot exists but does not hold a valid identity.
    #[error("persisted session is corrupt: {0}")]
    CorruptState(String),

    #[error(transparent)]
    Storage(#[from] SlotError),

    /// The store was opened with a config that does not validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Text for the toast shown by the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::InvalidCredentials => "Credenciales incorrectas",
            SessionError::CorruptState(_) | SessionError::Storage(_) => {
                "No se pudo recuperar la sesión"
            }
            SessionError::Config(_) => "Configuración de sesión inválida",
        }
    }
}
