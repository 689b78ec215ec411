use serde_json::json;
use veilvault_privacy::Scalar;
use veilvault_privacy::commitment::{build_commitment, commitment_leaf};
use veilvault_privacy::encoding::scalar_to_hex;
use veilvault_privacy::keys::{
    NonceCommitment, SpendingKey, TokenAddress, UserKey, account_fingerprint,
    derive_nonce_commitment, derive_spending_key, derive_view_key,
};

use crate::print_json;

pub fn view_key(user_key: Scalar) -> anyhow::Result<()> {
    let view_key = derive_view_key(&UserKey::from_scalar(user_key));
    print_json(&json!({ "view_key": scalar_to_hex(&view_key.as_scalar()) }))
}

pub fn commit(
    shares: Scalar,
    nullifier: Scalar,
    spending_key: Scalar,
    unlocks_at: Scalar,
    nonce_commitment: Scalar,
) -> anyhow::Result<()> {
    let point = build_commitment(
        shares,
        nullifier,
        &SpendingKey::from_scalar(spending_key),
        unlocks_at,
        &NonceCommitment(nonce_commitment),
    );
    print_json(&json!({
        "x": scalar_to_hex(&point.x()),
        "y": scalar_to_hex(&point.y()),
        "leaf": scalar_to_hex(&commitment_leaf(&point)),
    }))
}

pub fn keys(user_key: Scalar, token: TokenAddress, chain_id: u64, nonce: u64) -> anyhow::Result<()> {
    let user_key = UserKey::from_scalar(user_key);
    let spending_key = derive_spending_key(&user_key, chain_id, &token);
    let nonce_commitment = derive_nonce_commitment(&spending_key, nonce, &token);

    print_json(&json!({
        "chain_id": chain_id,
        "token": token,
        "spending_key": scalar_to_hex(&spending_key.as_scalar()),
        "view_key": scalar_to_hex(&derive_view_key(&user_key).as_scalar()),
        "fingerprint": scalar_to_hex(&account_fingerprint(&spending_key)),
        "nonce": nonce,
        "nonce_commitment": nonce_commitment,
    }))
}
