/// Errors from reading or decoding a tenant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    /// No tenant is attached to the context. Local only; never crosses the wire.
    #[error("no tenant in context")]
    NoTenant,
    /// The textual encoding is not a positive decimal integer.
    #[error("invalid tenant value {raw:?}: {reason}")]
    InvalidTenantValue { raw: String, reason: InvalidReason },
}

/// Why a raw tenant value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReason {
    #[error("value is empty")]
    Empty,
    #[error("value is negative")]
    Negative,
    #[error("value is zero")]
    Zero,
    #[error("value has leading zeros")]
    LeadingZero,
    #[error("value is not a decimal integer")]
    NotANumber,
    #[error("value does not fit in 64 bits")]
    OutOfRange,
}
