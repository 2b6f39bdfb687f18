// ============================================================================
// Customer Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("Invalid CPF: {0}")]
    InvalidCpf(String),

    #[error("Customer name cannot be empty")]
    EmptyName,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
}
