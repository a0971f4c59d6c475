//! Spam prevention: oracle vote rate limiting, IBC transfer size limits and
//! redundant packet relays

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use terra_core::address::Address;
use terra_core::chain::BlockHeight;
use terra_storage::StorageRead;
use terra_tx::{Msg, Tx};

use crate::{AnteDecorator, Ctx, Error, Result};

/// The oracle messages rate limited per block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OracleVoteKind {
    /// An aggregate exchange rate prevote
    Prevote,
    /// An aggregate exchange rate vote
    Vote,
}

impl std::fmt::Display for OracleVoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleVoteKind::Prevote => write!(f, "prevote"),
            OracleVoteKind::Vote => write!(f, "vote"),
        }
    }
}

/// An oracle message let through by [`OracleSpamDecorator`]. It is only
/// recorded in the tracker once the whole pipeline has admitted its tx.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOracleVote {
    #[allow(missing_docs)]
    pub kind: OracleVoteKind,
    #[allow(missing_docs)]
    pub validator: Address,
    /// Height of the check state the tx was admitted against
    pub height: BlockHeight,
}

/// The last heights at which each validator's oracle prevote and vote were
/// admitted into the mempool. Lives as long as the node.
#[derive(Debug, Default)]
pub struct OracleSpamTracker {
    prevotes: Mutex<BTreeMap<Address, BlockHeight>>,
    votes: Mutex<BTreeMap<Address, BlockHeight>>,
}

impl OracleSpamTracker {
    fn seen(
        &self,
        kind: OracleVoteKind,
    ) -> &Mutex<BTreeMap<Address, BlockHeight>> {
        match kind {
            OracleVoteKind::Prevote => &self.prevotes,
            OracleVoteKind::Vote => &self.votes,
        }
    }

    /// Fails if a message of `kind` from `validator` was already admitted at
    /// `height` or later
    pub fn check(
        &self,
        kind: OracleVoteKind,
        validator: &Address,
        height: BlockHeight,
    ) -> Result<()> {
        let seen = self.seen(kind).lock();
        check_unseen(&seen, kind, validator, height)
    }

    /// Record the oracle messages of an admitted tx. Nothing is recorded if
    /// any of them was admitted in another tx in the meantime.
    pub fn commit(&self, pending: &[PendingOracleVote]) -> Result<()> {
        let mut prevotes = self.prevotes.lock();
        let mut votes = self.votes.lock();
        for vote in pending {
            let seen = match vote.kind {
                OracleVoteKind::Prevote => &prevotes,
                OracleVoteKind::Vote => &votes,
            };
            check_unseen(seen, vote.kind, &vote.validator, vote.height)?;
        }
        for vote in pending {
            let seen = match vote.kind {
                OracleVoteKind::Prevote => &mut prevotes,
                OracleVoteKind::Vote => &mut votes,
            };
            seen.insert(vote.validator, vote.height);
        }
        Ok(())
    }
}

fn check_unseen(
    seen: &BTreeMap<Address, BlockHeight>,
    kind: OracleVoteKind,
    validator: &Address,
    height: BlockHeight,
) -> Result<()> {
    if matches!(seen.get(validator), Some(last) if *last >= height) {
        return Err(Error::OracleSpam(format!(
            "validator {validator} has already submitted a {kind} at the \
             current height"
        )));
    }
    Ok(())
}

/// Allow each validator one oracle prevote and one vote per block into the
/// mempool, submitted by the validator or its delegated feeder. The
/// admitted messages are left in the annotations for
/// [`AnteHandler`](crate::AnteHandler) to record.
#[derive(Clone, Debug)]
pub struct OracleSpamDecorator {
    /// Heights of the admitted votes
    pub tracker: Arc<OracleSpamTracker>,
}

impl<S> AnteDecorator<S> for OracleSpamDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "oracle_spam"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        if !ctx.is_check_tx() || simulate {
            return Ok(());
        }
        let height = ctx.storage.get_block_height()?;
        for msg in tx.msgs() {
            let (kind, feeder, validator) = match msg {
                Msg::AggregateExchangeRatePrevote {
                    feeder, validator, ..
                } => (OracleVoteKind::Prevote, feeder, validator),
                Msg::AggregateExchangeRateVote {
                    feeder, validator, ..
                } => (OracleVoteKind::Vote, feeder, validator),
                _ => continue,
            };
            terra_oracle::validate_feeder(&*ctx.storage, feeder, validator)?;
            self.tracker.check(kind, validator, height)?;
            let pending = &mut ctx.annotations.oracle_votes;
            if pending
                .iter()
                .any(|vote| vote.kind == kind && vote.validator == *validator)
            {
                return Err(Error::OracleSpam(format!(
                    "validator {validator} submits more than one {kind} in \
                     a tx"
                )));
            }
            pending.push(PendingOracleVote {
                kind,
                validator: *validator,
                height,
            });
        }
        Ok(())
    }
}

/// Bound the memo and receiver of IBC transfers, in bytes
#[derive(Clone, Copy, Debug)]
pub struct IbcTransferSpamDecorator {
    /// Longest memo accepted
    pub max_memo_length: u64,
    /// Longest receiver accepted
    pub max_receiver_length: u64,
}

impl<S> AnteDecorator<S> for IbcTransferSpamDecorator {
    fn name(&self) -> &'static str {
        "ibc_transfer_spam"
    }

    fn ante(
        &self,
        _ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        terra_tx::visit_msgs(tx.msgs(), &mut |msg: &Msg| -> Result<()> {
            if let Msg::Transfer { memo, receiver, .. } = msg {
                let memo_len =
                    u64::try_from(memo.len()).map_err(|_| Error::Overflow)?;
                if memo_len > self.max_memo_length {
                    return Err(Error::MemoTooLong {
                        max: self.max_memo_length,
                        got: memo_len,
                    });
                }
                let receiver_len = u64::try_from(receiver.len())
                    .map_err(|_| Error::Overflow)?;
                if receiver_len > self.max_receiver_length {
                    return Err(Error::ReceiverTooLong {
                        max: self.max_receiver_length,
                        got: receiver_len,
                    });
                }
            }
            Ok(())
        })
    }
}

/// Keep txs that only relay already processed IBC packets out of the
/// mempool
#[derive(Clone, Copy, Debug)]
pub struct RedundantRelayDecorator;

impl<S> AnteDecorator<S> for RedundantRelayDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "redundant_relay"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        if !ctx.is_check_tx() || simulate {
            return Ok(());
        }
        let mut relays = 0_usize;
        let mut redundant = 0_usize;
        for msg in tx.msgs() {
            if msg.relayed_packet().is_some() {
                relays = relays.saturating_add(1);
                if terra_ibc::is_redundant(&*ctx.storage, msg)? {
                    redundant = redundant.saturating_add(1);
                }
            }
        }
        if relays > 0 && relays == redundant {
            return Err(Error::RedundantRelay);
        }
        Ok(())
    }
}
