//! Merchant domain configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Settings applied when onboarding merchants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// How long a newly approved merchant stays active, counted from submission.
    pub membership_days: i64,
    /// Level assigned to newly approved merchants.
    pub default_level: i32,
    /// Caller allow-list written into freshly provisioned API credentials.
    pub api_white_list: String,
    /// Domain used to derive a merchant host when none is bound explicitly.
    pub server_domain: String,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            membership_days: 365,
            default_level: 1,
            api_white_list: "*".to_string(),
            server_domain: "localhost".to_string(),
        }
    }
}

impl MerchantConfig {
    /// Load from `VENDORLEDGER_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, secrets file, tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("VENDORLEDGER_MEMBERSHIP_DAYS") {
            config.membership_days = raw
                .trim()
                .parse()
                .with_context(|| format!("VENDORLEDGER_MEMBERSHIP_DAYS is not a number: {raw:?}"))?;
            anyhow::ensure!(
                config.membership_days > 0,
                "VENDORLEDGER_MEMBERSHIP_DAYS must be positive"
            );
        }
        if let Some(raw) = lookup("VENDORLEDGER_DEFAULT_LEVEL") {
            config.default_level = raw
                .trim()
                .parse()
                .with_context(|| format!("VENDORLEDGER_DEFAULT_LEVEL is not a number: {raw:?}"))?;
        }
        if let Some(raw) = lookup("VENDORLEDGER_API_WHITE_LIST") {
            config.api_white_list = raw;
        }
        match lookup("VENDORLEDGER_SERVER_DOMAIN") {
            Some(raw) => config.server_domain = raw,
            None => tracing::warn!(
                domain = %config.server_domain,
                "VENDORLEDGER_SERVER_DOMAIN not set; using default"
            ),
        }

        Ok(config)
    }
}
