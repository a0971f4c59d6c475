//! Transaction envelope types

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::coin::Coins;
use terra_core::key::PublicKey;

use crate::msg::Msg;
use crate::{Error, Result};

/// The fee offered by a transaction
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub struct Fee {
    /// Coins offered to cover gas and tax
    pub amount: Coins,
    /// Gas limit of the transaction
    pub gas_limit: u64,
    /// Account whose fee grant allowance pays the fee
    pub granter: Option<Address>,
}

/// Signer metadata, positionally matching [`Tx::signers`]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignerInfo {
    /// The signer's public key, required until the account stores one
    pub public_key: Option<PublicKey>,
    /// The signer's account sequence the signature commits to
    pub sequence: u64,
}

/// Authorization data of a transaction
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub struct AuthInfo {
    /// One entry per signer
    pub signer_infos: Vec<SignerInfo>,
    /// The fee
    pub fee: Fee,
}

/// The signed body of a transaction
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub struct TxBody {
    /// Messages executed in order
    pub messages: Vec<Msg>,
    /// Free-form note
    pub memo: String,
    /// Last block height the tx is valid at, zero for no timeout
    pub timeout_height: u64,
    /// Type urls of the extension options attached to the tx
    pub extension_options: Vec<String>,
}

/// A transaction
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub struct Tx {
    /// Signed body
    pub body: TxBody,
    /// Signer and fee information
    pub auth_info: AuthInfo,
    /// Signatures, positionally matching [`Tx::signers`]
    pub signatures: Vec<Vec<u8>>,
}

impl Tx {
    /// Decode a tx from its wire bytes
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        Tx::try_from_slice(bytes)
            .map_err(|err| Error::TxDecode(err.to_string()))
    }

    /// Encode the tx to its wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        terra_core::encode(self)
    }

    /// The messages of the tx
    pub fn msgs(&self) -> &[Msg] {
        &self.body.messages
    }

    /// The fee of the tx
    pub fn fee(&self) -> &Fee {
        &self.auth_info.fee
    }

    /// The gas limit of the tx
    pub fn gas(&self) -> u64 {
        self.auth_info.fee.gas_limit
    }

    /// The unique signers of all messages, in order of first appearance
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = vec![];
        for signer in self.msgs().iter().flat_map(Msg::signers) {
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        signers
    }

    /// The account paying the fee, always the first signer. A fee granter
    /// only pays through an allowance granted to this account.
    pub fn fee_payer(&self) -> Option<Address> {
        self.signers().first().copied()
    }

    /// The fee granter, if any
    pub fn fee_granter(&self) -> Option<Address> {
        self.auth_info.fee.granter
    }

    /// The first signer and the sequence it signed with, as used for
    /// mempool ordering
    pub fn first_signer_and_sequence(&self) -> Result<(Address, u64)> {
        let signer =
            self.signers().first().copied().ok_or(Error::NoSigners)?;
        let sequence = self
            .auth_info
            .signer_infos
            .first()
            .map(|info| info.sequence)
            .ok_or(Error::NoSigners)?;
        Ok((signer, sequence))
    }

    /// Check if every message of a non-empty tx is an oracle prevote or vote
    pub fn is_oracle_tx(&self) -> bool {
        !self.msgs().is_empty() && self.msgs().iter().all(Msg::is_oracle)
    }

    /// Stateless checks of the tx and of all its messages
    pub fn validate_basic(&self) -> Result<()> {
        if self.msgs().is_empty() {
            return Err(Error::InvalidRequest(
                "must contain at least one message",
            ));
        }
        let signers = self.signers();
        if signers.is_empty() {
            return Err(Error::NoSigners);
        }
        if self.signatures.len() != signers.len() {
            return Err(Error::SignatureCount {
                expected: signers.len(),
                got: self.signatures.len(),
            });
        }
        if self.auth_info.signer_infos.len() != signers.len() {
            return Err(Error::SignatureCount {
                expected: signers.len(),
                got: self.auth_info.signer_infos.len(),
            });
        }
        self.fee()
            .amount
            .validate()
            .map_err(|err| Error::InvalidCoins(err.to_string()))?;
        self.msgs().iter().try_for_each(Msg::validate_basic)
    }
}
