//! Tenant identifiers and their attachment to a [`Context`].

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{InvalidReason, TenantError};

/// A tenant identifier. Always positive; "no tenant" is the absence of one.
///
/// `Display` produces the canonical wire encoding: base-10, no sign, no
/// leading zeros. [`Tenant::unmarshal`] accepts exactly that encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Tenant(NonZeroU64);

impl Tenant {
    /// Returns `None` for zero.
    #[must_use]
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    /// The canonical numeric value.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0.get()
    }

    /// Parses the textual encoding of a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`TenantError::InvalidTenantValue`] unless `raw` is a base-10
    /// positive integer without sign, whitespace, or leading zeros that fits
    /// in 64 bits. Non-canonical forms a lenient peer might accept, such as
    /// `+5` or `007`, are rejected.
    pub fn unmarshal(raw: &str) -> Result<Self, TenantError> {
        let invalid = |reason| TenantError::InvalidTenantValue {
            raw: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid(InvalidReason::Empty));
        }
        if let Some(rest) = raw.strip_prefix('-') {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(InvalidReason::Negative));
            }
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(InvalidReason::NotANumber));
        }
        if raw.bytes().all(|b| b == b'0') {
            return Err(invalid(InvalidReason::Zero));
        }
        if raw.starts_with('0') {
            return Err(invalid(InvalidReason::LeadingZero));
        }

        let id: u64 = raw
            .parse()
            .map_err(|_| invalid(InvalidReason::OutOfRange))?;
        Self::new(id).ok_or_else(|| invalid(InvalidReason::Zero))
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Tenant {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::unmarshal(s)
    }
}

impl TryFrom<u64> for Tenant {
    type Error = TenantError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| TenantError::InvalidTenantValue {
            raw: id.to_string(),
            reason: InvalidReason::Zero,
        })
    }
}

impl From<Tenant> for u64 {
    fn from(tenant: Tenant) -> Self {
        tenant.id()
    }
}

/// Context key for the attached tenant. Private so the only way in is
/// [`with_tenant`].
struct TenantKey(Tenant);

/// Returns the tenant attached to `ctx`.
///
/// # Errors
///
/// Returns [`TenantError::NoTenant`] if nothing is attached.
pub fn from_context(ctx: &Context) -> Result<Tenant, TenantError> {
    ctx.value::<TenantKey>()
        .map(|key| key.0)
        .ok_or(TenantError::NoTenant)
}

/// Derives a context with `tenant` attached, shadowing any earlier tenant.
#[must_use]
pub fn with_tenant(ctx: &Context, tenant: Tenant) -> Context {
    ctx.with_value(TenantKey(tenant))
}
