//! Signer accounts, signature gas and verification

use terra_account::BaseAccount;
use terra_core::address::Address;
use terra_core::key::{PublicKey, SchemeType};
use terra_gas::{GasMetering, SIG_VERIFY_DESCRIPTOR};
use terra_parameters::AuthParams;
use terra_storage::{StorageRead, StorageWrite};
use terra_tx::{SignerInfo, Tx};

use crate::{AnteDecorator, Ctx, Error, Result};

/// The signers paired with their signer infos and signatures
fn signers(
    tx: &Tx,
) -> impl Iterator<Item = (Address, &SignerInfo, &Vec<u8>)> + '_ {
    tx.signers()
        .into_iter()
        .zip(&tx.auth_info.signer_infos)
        .zip(&tx.signatures)
        .map(|((signer, info), sig)| (signer, info, sig))
}

/// Store the public key of signers whose account has none yet
#[derive(Clone, Copy, Debug)]
pub struct SetPubKeyDecorator;

impl<S> AnteDecorator<S> for SetPubKeyDecorator
where
    S: StorageRead + StorageWrite,
{
    fn name(&self) -> &'static str {
        "set_pub_key"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        for (signer, info, _) in signers(tx) {
            let Some(pub_key) = &info.public_key else {
                continue;
            };
            // Simulations may carry placeholder keys
            if simulate && pub_key.address() != signer {
                continue;
            }
            terra_account::set_pub_key_if_missing(
                &mut *ctx.storage,
                &signer,
                pub_key,
            )?;
        }
        Ok(())
    }
}

/// Bound the number of signatures
#[derive(Clone, Copy, Debug)]
pub struct ValidateSigCountDecorator;

impl<S> AnteDecorator<S> for ValidateSigCountDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "validate_sig_count"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        let params: AuthParams = terra_parameters::read(&*ctx.storage)?;
        let got =
            u64::try_from(tx.signatures.len()).map_err(|_| Error::Overflow)?;
        if got > params.tx_sig_limit {
            return Err(Error::TooManySignatures {
                got,
                limit: params.tx_sig_limit,
            });
        }
        Ok(())
    }
}

/// Charge gas for verifying each signature, by key scheme
#[derive(Clone, Copy, Debug)]
pub struct SigGasConsumeDecorator;

impl<S> AnteDecorator<S> for SigGasConsumeDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "sig_gas_consume"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        let params: AuthParams = terra_parameters::read(&*ctx.storage)?;
        for (signer, info, _) in signers(tx) {
            let pub_key = match signer_pub_key(&*ctx.storage, &signer, info)? {
                Some(pub_key) => Some(pub_key),
                None if simulate => None,
                None => return Err(Error::NoPubKey(signer)),
            };
            // Unknown keys are charged as the costlier scheme
            let cost = match pub_key.as_ref().map(PublicKey::scheme) {
                Some(SchemeType::Ed25519) => params.sig_verify_cost_ed25519,
                Some(SchemeType::Secp256k1) | None => {
                    params.sig_verify_cost_secp256k1
                }
            };
            ctx.gas_meter.consume(cost, SIG_VERIFY_DESCRIPTOR)?;
        }
        Ok(())
    }
}

/// The key a signer signs with: the key stored on its account, else the
/// one in its signer info
fn signer_pub_key<S>(
    storage: &S,
    signer: &Address,
    info: &SignerInfo,
) -> Result<Option<PublicKey>>
where
    S: StorageRead,
{
    let stored = terra_account::read_account(storage, signer)?
        .and_then(|account| account.pub_key);
    Ok(stored.or_else(|| info.public_key.clone()))
}

/// Check the signers' sequences and, outside of simulation, their
/// signatures over the sign bytes
#[derive(Clone, Copy, Debug)]
pub struct SigVerificationDecorator;

impl<S> AnteDecorator<S> for SigVerificationDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "sig_verification"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        let chain_id = ctx.storage.get_chain_id()?;
        let height = ctx.storage.get_block_height()?;
        for (signer, info, sig) in signers(tx) {
            let BaseAccount {
                pub_key,
                account_number,
                sequence,
                ..
            } = terra_account::read_account(&*ctx.storage, &signer)?
                .ok_or(terra_account::Error::UnknownAddress(signer))?;
            let pub_key = match pub_key {
                Some(pub_key) => pub_key,
                None if simulate => continue,
                None => return Err(Error::NoPubKey(signer)),
            };
            if info.sequence != sequence {
                return Err(Error::SequenceMismatch {
                    expected: sequence,
                    got: info.sequence,
                });
            }
            if simulate {
                continue;
            }
            // Genesis txs are signed before accounts are numbered
            let account_number =
                if height.is_genesis() { 0 } else { account_number };
            let sign_bytes =
                terra_tx::sign_bytes(tx, &chain_id, account_number, sequence);
            if pub_key.verify(&sign_bytes, sig).is_err() {
                return Err(Error::SigVerification {
                    account_number,
                    chain_id: chain_id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Increment the sequence of every signer
#[derive(Clone, Copy, Debug)]
pub struct IncrementSequenceDecorator;

impl<S> AnteDecorator<S> for IncrementSequenceDecorator
where
    S: StorageRead + StorageWrite,
{
    fn name(&self) -> &'static str {
        "increment_sequence"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        for signer in tx.signers() {
            let sequence =
                terra_account::increment_sequence(&mut *ctx.storage, &signer)?;
            tracing::trace!(%signer, sequence, "Incremented sequence");
        }
        Ok(())
    }
}
