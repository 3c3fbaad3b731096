/// Errors that can occur while building or registering schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The registration set (internal or user) was already installed.
    #[error("schema is already registered")]
    AlreadyRegistered,

    /// User messages cannot be registered before the internal set.
    #[error("internal schema is not registered")]
    InternalNotRegistered,

    /// Two messages in the same registration set share a signature.
    #[error("duplicate signature: {0}")]
    DuplicateSignature(String),

    /// A field's `extra` parameter does not match its declared type.
    #[error("invalid extra for field '{field}' in message '{message}'")]
    InvalidExtra { message: String, field: String },

    /// A handler was bound to a signature no registered message has.
    #[error("unknown signature: {0}")]
    UnknownSignature(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
