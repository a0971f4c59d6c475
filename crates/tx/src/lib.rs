//! Transaction construction types: the tx envelope, its messages and the
//! bytes its signers commit to.

#![warn(missing_docs)]

pub mod msg;
pub mod sign;
mod types;

pub use msg::{visit_msgs, InputOutput, Msg, Packet, MAX_AUTHZ_DEPTH};
pub use sign::{sign_bytes, sign_tx};
use thiserror::Error;
pub use types::{AuthInfo, Fee, SignerInfo, Tx, TxBody};

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid coins: {0}")]
    InvalidCoins(String),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("max authz nesting depth of {0} exceeded")]
    MaxDepth(usize),
    #[error("tx must have at least one signer")]
    NoSigners,
    #[error("wrong number of signatures; expected {expected}, got {got}")]
    SignatureCount { expected: usize, got: usize },
    #[error("tx parse error: {0}")]
    TxDecode(String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Helpers for building transactions in tests.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::prelude::*;
    use terra_core::address::testing::arb_address;
    use terra_core::chain::ChainId;
    use terra_core::coin::testing::arb_coins;
    use terra_core::coin::Coins;
    use terra_core::key::SecretKey;

    use super::*;

    /// Generate an arbitrary message, possibly nested in authz execs
    pub fn arb_msg() -> impl Strategy<Value = Msg> {
        let leaf = prop_oneof![
            (arb_address(), arb_address(), arb_coins()).prop_map(
                |(from, to, amount)| Msg::Send { from, to, amount }
            ),
            (arb_address(), arb_address(), "[0-9a-f]{8}").prop_map(
                |(feeder, validator, hash)| {
                    Msg::AggregateExchangeRatePrevote {
                        hash,
                        feeder,
                        validator,
                    }
                }
            ),
            (arb_address(), arb_coins(), "[a-zA-Z ]{0,16}").prop_map(
                |(proposer, initial_deposit, title)| Msg::SubmitProposal {
                    proposer,
                    initial_deposit,
                    title,
                }
            ),
            (arb_address(), "/[a-z.]{1,24}")
                .prop_map(|(signer, type_url)| Msg::Other { type_url, signer }),
        ];
        leaf.prop_recursive(2, 8, 3, |inner| {
            (arb_address(), proptest::collection::vec(inner, 1..3))
                .prop_map(|(grantee, msgs)| Msg::Exec { grantee, msgs })
        })
    }

    /// Generate an arbitrary unsigned tx
    pub fn arb_tx() -> impl Strategy<Value = Tx> {
        (
            proptest::collection::vec(arb_msg(), 1..4),
            arb_coins(),
            any::<u64>(),
            "[a-z ]{0,32}",
        )
            .prop_map(|(messages, amount, gas_limit, memo)| {
                let mut tx = Tx::default();
                tx.body.messages = messages;
                tx.body.memo = memo;
                tx.auth_info.fee.amount = amount;
                tx.auth_info.fee.gas_limit = gas_limit;
                tx
            })
    }

    /// Builder of signed test transactions
    #[derive(Clone, Debug, Default)]
    pub struct TxBuilder {
        tx: Tx,
        signers: Vec<(SecretKey, u64)>,
    }

    impl TxBuilder {
        /// Start a tx with the given messages
        pub fn new(messages: Vec<Msg>) -> Self {
            let mut builder = Self::default();
            builder.tx.body.messages = messages;
            builder
        }

        /// Set the fee coins and gas limit
        pub fn fee(mut self, amount: Coins, gas_limit: u64) -> Self {
            self.tx.auth_info.fee.amount = amount;
            self.tx.auth_info.fee.gas_limit = gas_limit;
            self
        }

        /// Set the fee granter
        pub fn granter(
            mut self,
            granter: terra_core::address::Address,
        ) -> Self {
            self.tx.auth_info.fee.granter = Some(granter);
            self
        }

        /// Set the memo
        pub fn memo(mut self, memo: impl Into<String>) -> Self {
            self.tx.body.memo = memo.into();
            self
        }

        /// Set the timeout height
        pub fn timeout_height(mut self, height: u64) -> Self {
            self.tx.body.timeout_height = height;
            self
        }

        /// Attach an extension option
        pub fn extension_option(mut self, type_url: impl Into<String>) -> Self {
            self.tx.body.extension_options.push(type_url.into());
            self
        }

        /// Add the next signer with its key, account number and sequence
        pub fn signer(
            mut self,
            secret_key: SecretKey,
            account_number: u64,
            sequence: u64,
        ) -> Self {
            self.tx.auth_info.signer_infos.push(SignerInfo {
                public_key: Some(secret_key.ref_to()),
                sequence,
            });
            self.signers.push((secret_key, account_number));
            self
        }

        /// Sign for the given chain and return the tx
        pub fn sign(self, chain_id: &ChainId) -> Tx {
            let mut tx = self.tx;
            for (index, (secret_key, account_number)) in
                self.signers.iter().enumerate()
            {
                sign_tx(&mut tx, index, secret_key, chain_id, *account_number);
            }
            tx
        }

        /// Return the tx without signing it, padding the signatures with
        /// placeholders so the count matches the signer infos
        pub fn build_unsigned(self) -> Tx {
            let mut tx = self.tx;
            tx.signatures = vec![vec![0; 64]; tx.auth_info.signer_infos.len()];
            tx
        }
    }
}
