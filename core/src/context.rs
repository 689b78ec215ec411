//! Per-session key material.
//!
//! A [`SessionContext`] is built once per (user, chain, token) and handed to
//! every call that needs keys. Contexts are independent values, so separate
//! accounts can be reconstructed on separate threads.

use veilvault_privacy::Scalar;
use veilvault_privacy::keys::{
    NonceCommitment, SpendingKey, TokenAddress, UserKey, ViewKey, account_fingerprint,
    derive_nonce_commitment, derive_spending_key, derive_view_key,
};

#[derive(Debug, Clone)]
pub struct SessionContext {
    user_key: UserKey,
    chain_id: u64,
    token: TokenAddress,
    spending_key: SpendingKey,
    view_key: ViewKey,
}

impl SessionContext {
    pub fn new(user_key: UserKey, chain_id: u64, token: TokenAddress) -> Self {
        Self {
            spending_key: derive_spending_key(&user_key, chain_id, &token),
            view_key: derive_view_key(&user_key),
            user_key,
            chain_id,
            token,
        }
    }

    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn token(&self) -> &TokenAddress {
        &self.token
    }

    pub fn spending_key(&self) -> &SpendingKey {
        &self.spending_key
    }

    pub fn view_key(&self) -> &ViewKey {
        &self.view_key
    }

    pub fn nonce_commitment(&self, nonce: u64) -> NonceCommitment {
        derive_nonce_commitment(&self.spending_key, nonce, &self.token)
    }

    /// Non-secret account identity, safe to use as a storage key.
    pub fn fingerprint(&self) -> Scalar {
        account_fingerprint(&self.spending_key)
    }
}
