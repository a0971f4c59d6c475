//! Sign bytes of a transaction

use borsh::BorshSerialize;
use terra_core::chain::ChainId;
use terra_core::key::SecretKey;

use crate::types::{Fee, Tx, TxBody};

/// The document a signer commits to
#[derive(BorshSerialize)]
struct SignDoc<'a> {
    chain_id: &'a ChainId,
    account_number: u64,
    sequence: u64,
    body: &'a TxBody,
    fee: &'a Fee,
}

/// The bytes a signer with the given account number and sequence signs:
/// the sha256 digest of the borsh encoded sign document.
pub fn sign_bytes(
    tx: &Tx,
    chain_id: &ChainId,
    account_number: u64,
    sequence: u64,
) -> [u8; 32] {
    let doc = SignDoc {
        chain_id,
        account_number,
        sequence,
        body: &tx.body,
        fee: &tx.auth_info.fee,
    };
    terra_core::sha256(terra_core::encode(&doc))
}

/// Sign the tx in place for the signer at `index`. The signer info at that
/// index must already carry the sequence.
pub fn sign_tx(
    tx: &mut Tx,
    index: usize,
    secret_key: &SecretKey,
    chain_id: &ChainId,
    account_number: u64,
) {
    let sequence = tx
        .auth_info
        .signer_infos
        .get(index)
        .map(|info| info.sequence)
        .unwrap_or_default();
    let bytes = sign_bytes(tx, chain_id, account_number, sequence);
    let sig = secret_key.sign(&bytes);
    if tx.signatures.len() <= index {
        tx.signatures.resize(index.saturating_add(1), vec![]);
    }
    tx.signatures[index] = sig;
}
