//! Open-API credentials issued to a merchant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vendorledger_core::{DomainError, DomainResult, MerchantId};

use crate::ports::MerchantRepository;

/// Caller white list entry meaning "any address".
pub const ALLOW_ANY: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub merchant_id: MerchantId,
    pub api_id: String,
    pub api_secret: String,
    /// Comma-separated caller addresses, or `*`.
    pub white_list: String,
    pub enabled: bool,
}

fn new_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

impl ApiInfo {
    /// Fresh, enabled credentials.
    pub fn generate(merchant_id: MerchantId, white_list: &str) -> Self {
        Self {
            merchant_id,
            api_id: Uuid::now_v7().simple().to_string(),
            api_secret: new_secret(),
            white_list: white_list.to_string(),
            enabled: true,
        }
    }

    /// Whether `caller` may use these credentials.
    pub fn allows_caller(&self, caller: &str) -> bool {
        self.enabled
            && self
                .white_list
                .split(',')
                .map(str::trim)
                .any(|entry| entry == ALLOW_ANY || entry == caller)
    }
}

/// API credentials facade scoped to one merchant.
#[derive(Clone)]
pub struct ApiManager {
    merchant_id: MerchantId,
    repo: Arc<dyn MerchantRepository>,
}

impl ApiManager {
    pub fn new(merchant_id: MerchantId, repo: Arc<dyn MerchantRepository>) -> Self {
        Self { merchant_id, repo }
    }

    pub fn api_info(&self) -> DomainResult<Option<ApiInfo>> {
        self.repo.get_api_info(self.merchant_id)
    }

    fn require_api_info(&self) -> DomainResult<ApiInfo> {
        self.api_info()?
            .ok_or_else(|| DomainError::persistence("api credentials not provisioned"))
    }

    pub fn save_api_info(&self, mut info: ApiInfo) -> DomainResult<()> {
        info.merchant_id = self.merchant_id;
        self.repo.save_api_info(&info)
    }

    pub fn set_enabled(&self, enabled: bool) -> DomainResult<()> {
        let mut info = self.require_api_info()?;
        info.enabled = enabled;
        self.repo.save_api_info(&info)
    }

    /// Replace the secret, keeping the API id. Returns the new secret.
    pub fn refresh_secret(&self) -> DomainResult<String> {
        let mut info = self.require_api_info()?;
        info.api_secret = new_secret();
        self.repo.save_api_info(&info)?;
        Ok(info.api_secret)
    }
}
