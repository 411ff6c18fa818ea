//! TLS trust policy shared by the data-plane client and token acquisition.

use log::warn;

/// Whether certificate chain validation is enforced for outbound TLS.
///
/// Derived once per client (or per token-acquisition call) from the
/// `cert_check_disabled` configuration flag and immutable for the life of
/// the TLS context it produces. The flag is always passed in explicitly;
/// nothing in this crate reads trust state from a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustDecision {
    /// Validate certificate chains against the platform trust store.
    #[default]
    StrictValidation,
    /// Accept any certificate chain.
    ///
    /// A deliberately insecure development mode for endpoints with
    /// self-signed certificates. Hostname verification is still performed.
    TrustAll,
}

impl TrustDecision {
    /// Derive the decision from the `cert_check_disabled` settings flag.
    #[must_use]
    pub const fn from_cert_check_disabled(disabled: bool) -> Self {
        if disabled {
            Self::TrustAll
        } else {
            Self::StrictValidation
        }
    }

    /// Apply this trust decision to a client under construction.
    ///
    /// Strict validation leaves the builder untouched; trust-all disables
    /// certificate chain validation and logs a warning, since this must be
    /// visible whenever it is in effect.
    #[must_use]
    pub fn apply(self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        match self {
            Self::StrictValidation => builder,
            Self::TrustAll => {
                warn!("SSL certificate checking for endpoints has been explicitly disabled");
                builder.danger_accept_invalid_certs(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn decision_maps_from_flag() {
        assert_eq!(
            TrustDecision::from_cert_check_disabled(false),
            TrustDecision::StrictValidation
        );
        assert_eq!(
            TrustDecision::from_cert_check_disabled(true),
            TrustDecision::TrustAll
        );
    }

    #[test]
    fn applied_builders_still_construct() {
        for decision in [TrustDecision::StrictValidation, TrustDecision::TrustAll] {
            let client = decision.apply(reqwest::Client::builder()).build();
            assert!(client.is_ok());
        }
    }
}
