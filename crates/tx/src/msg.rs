//! Transaction messages. Only the messages the admission pipeline inspects
//! are modeled in detail; any other message is carried as [`Msg::Other`].

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::coin::{validate_denom, Coin, Coins};
use terra_core::dec::Dec;

use crate::{Error, Result};

/// Maximum nesting of authz exec messages
pub const MAX_AUTHZ_DEPTH: usize = 8;

#[allow(missing_docs)]
pub mod type_url {
    pub const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
    pub const MSG_MULTI_SEND: &str = "/cosmos.bank.v1beta1.MsgMultiSend";
    pub const MSG_SWAP: &str = "/terra.market.v1beta1.MsgSwap";
    pub const MSG_SWAP_SEND: &str = "/terra.market.v1beta1.MsgSwapSend";
    pub const MSG_INSTANTIATE_CONTRACT: &str =
        "/cosmwasm.wasm.v1.MsgInstantiateContract";
    pub const MSG_INSTANTIATE_CONTRACT2: &str =
        "/cosmwasm.wasm.v1.MsgInstantiateContract2";
    pub const MSG_EXECUTE_CONTRACT: &str =
        "/cosmwasm.wasm.v1.MsgExecuteContract";
    pub const MSG_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
    pub const MSG_UNDELEGATE: &str = "/cosmos.staking.v1beta1.MsgUndelegate";
    pub const MSG_EDIT_VALIDATOR: &str =
        "/cosmos.staking.v1beta1.MsgEditValidator";
    pub const MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE: &str =
        "/terra.oracle.v1beta1.MsgAggregateExchangeRatePrevote";
    pub const MSG_AGGREGATE_EXCHANGE_RATE_VOTE: &str =
        "/terra.oracle.v1beta1.MsgAggregateExchangeRateVote";
    pub const MSG_TRANSFER: &str = "/ibc.applications.transfer.v1.MsgTransfer";
    pub const MSG_RECV_PACKET: &str = "/ibc.core.channel.v1.MsgRecvPacket";
    pub const MSG_ACKNOWLEDGEMENT: &str =
        "/ibc.core.channel.v1.MsgAcknowledgement";
    pub const MSG_TIMEOUT: &str = "/ibc.core.channel.v1.MsgTimeout";
    pub const MSG_UPDATE_CLIENT: &str = "/ibc.core.client.v1.MsgUpdateClient";
    pub const MSG_EXEC: &str = "/cosmos.authz.v1beta1.MsgExec";
    pub const MSG_SUBMIT_PROPOSAL: &str =
        "/cosmos.gov.v1beta1.MsgSubmitProposal";
}

/// One side of a multi-send
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InputOutput {
    /// Account the coins leave or arrive at
    pub address: Address,
    /// Coins moved
    pub coins: Coins,
}

/// An IBC packet, as relayed
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Packet {
    /// Packet sequence on the sending channel
    pub sequence: u64,
    /// Sending port
    pub source_port: String,
    /// Sending channel
    pub source_channel: String,
    /// Receiving port
    pub destination_port: String,
    /// Receiving channel
    pub destination_channel: String,
    /// Opaque application data
    pub data: Vec<u8>,
}

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Msg {
    Send {
        from: Address,
        to: Address,
        amount: Coins,
    },
    MultiSend {
        inputs: Vec<InputOutput>,
        outputs: Vec<InputOutput>,
    },
    Swap {
        trader: Address,
        offer_coin: Coin,
        ask_denom: String,
    },
    SwapSend {
        from: Address,
        to: Address,
        offer_coin: Coin,
        ask_denom: String,
    },
    InstantiateContract {
        sender: Address,
        admin: Option<Address>,
        code_id: u64,
        funds: Coins,
        msg: Vec<u8>,
    },
    InstantiateContract2 {
        sender: Address,
        admin: Option<Address>,
        code_id: u64,
        funds: Coins,
        msg: Vec<u8>,
        salt: Vec<u8>,
    },
    ExecuteContract {
        sender: Address,
        contract: Address,
        funds: Coins,
        msg: Vec<u8>,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    Undelegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    EditValidator {
        validator: Address,
        commission_rate: Option<Dec>,
    },
    AggregateExchangeRatePrevote {
        hash: String,
        feeder: Address,
        validator: Address,
    },
    AggregateExchangeRateVote {
        exchange_rates: String,
        salt: String,
        feeder: Address,
        validator: Address,
    },
    Transfer {
        source_port: String,
        source_channel: String,
        token: Coin,
        sender: Address,
        receiver: String,
        timeout_height: u64,
        memo: String,
    },
    RecvPacket {
        packet: Packet,
        signer: Address,
    },
    Acknowledgement {
        packet: Packet,
        signer: Address,
    },
    Timeout {
        packet: Packet,
        signer: Address,
    },
    UpdateClient {
        client_id: String,
        signer: Address,
    },
    Exec {
        grantee: Address,
        msgs: Vec<Msg>,
    },
    SubmitProposal {
        proposer: Address,
        initial_deposit: Coins,
        title: String,
    },
    Other {
        type_url: String,
        signer: Address,
    },
}

impl Msg {
    /// The protobuf type url the message is known by on chain
    pub fn type_url(&self) -> &str {
        use type_url::*;
        match self {
            Msg::Send { .. } => MSG_SEND,
            Msg::MultiSend { .. } => MSG_MULTI_SEND,
            Msg::Swap { .. } => MSG_SWAP,
            Msg::SwapSend { .. } => MSG_SWAP_SEND,
            Msg::InstantiateContract { .. } => MSG_INSTANTIATE_CONTRACT,
            Msg::InstantiateContract2 { .. } => MSG_INSTANTIATE_CONTRACT2,
            Msg::ExecuteContract { .. } => MSG_EXECUTE_CONTRACT,
            Msg::Delegate { .. } => MSG_DELEGATE,
            Msg::Undelegate { .. } => MSG_UNDELEGATE,
            Msg::EditValidator { .. } => MSG_EDIT_VALIDATOR,
            Msg::AggregateExchangeRatePrevote { .. } => {
                MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE
            }
            Msg::AggregateExchangeRateVote { .. } => {
                MSG_AGGREGATE_EXCHANGE_RATE_VOTE
            }
            Msg::Transfer { .. } => MSG_TRANSFER,
            Msg::RecvPacket { .. } => MSG_RECV_PACKET,
            Msg::Acknowledgement { .. } => MSG_ACKNOWLEDGEMENT,
            Msg::Timeout { .. } => MSG_TIMEOUT,
            Msg::UpdateClient { .. } => MSG_UPDATE_CLIENT,
            Msg::Exec { .. } => MSG_EXEC,
            Msg::SubmitProposal { .. } => MSG_SUBMIT_PROPOSAL,
            Msg::Other { type_url, .. } => type_url,
        }
    }

    /// The addresses that must sign the message
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::Send { from, .. } | Msg::SwapSend { from, .. } => vec![*from],
            Msg::MultiSend { inputs, .. } => {
                inputs.iter().map(|input| input.address).collect()
            }
            Msg::Swap { trader, .. } => vec![*trader],
            Msg::InstantiateContract { sender, .. }
            | Msg::InstantiateContract2 { sender, .. }
            | Msg::ExecuteContract { sender, .. }
            | Msg::Transfer { sender, .. } => vec![*sender],
            Msg::Delegate { delegator, .. }
            | Msg::Undelegate { delegator, .. } => vec![*delegator],
            Msg::EditValidator { validator, .. } => vec![*validator],
            Msg::AggregateExchangeRatePrevote { feeder, .. }
            | Msg::AggregateExchangeRateVote { feeder, .. } => vec![*feeder],
            Msg::RecvPacket { signer, .. }
            | Msg::Acknowledgement { signer, .. }
            | Msg::Timeout { signer, .. }
            | Msg::UpdateClient { signer, .. }
            | Msg::Other { signer, .. } => vec![*signer],
            Msg::Exec { grantee, .. } => vec![*grantee],
            Msg::SubmitProposal { proposer, .. } => vec![*proposer],
        }
    }

    /// Check if the message is an oracle exchange rate prevote or vote
    pub fn is_oracle(&self) -> bool {
        matches!(
            self,
            Msg::AggregateExchangeRatePrevote { .. }
                | Msg::AggregateExchangeRateVote { .. }
        )
    }

    /// Check if the message relays an IBC packet
    pub fn relayed_packet(&self) -> Option<&Packet> {
        match self {
            Msg::RecvPacket { packet, .. }
            | Msg::Acknowledgement { packet, .. }
            | Msg::Timeout { packet, .. } => Some(packet),
            _ => None,
        }
    }

    /// Stateless checks of the message
    pub fn validate_basic(&self) -> Result<()> {
        self.validate_basic_at_depth(0)
    }

    fn validate_basic_at_depth(&self, depth: usize) -> Result<()> {
        match self {
            Msg::Send { amount, .. } => validate_positive_coins(amount),
            Msg::MultiSend { inputs, outputs } => {
                if inputs.is_empty() {
                    return Err(Error::InvalidRequest("no inputs to send"));
                }
                if outputs.is_empty() {
                    return Err(Error::InvalidRequest("no outputs to send"));
                }
                let mut total_in = Coins::new();
                for input in inputs {
                    validate_positive_coins(&input.coins)?;
                    total_in = total_in
                        .checked_add(&input.coins)
                        .ok_or(Error::InvalidCoins("input overflow".into()))?;
                }
                let mut total_out = Coins::new();
                for output in outputs {
                    validate_positive_coins(&output.coins)?;
                    total_out = total_out
                        .checked_add(&output.coins)
                        .ok_or(Error::InvalidCoins("output overflow".into()))?;
                }
                if total_in != total_out {
                    return Err(Error::InvalidRequest(
                        "sum inputs != sum outputs",
                    ));
                }
                Ok(())
            }
            Msg::Swap {
                offer_coin,
                ask_denom,
                ..
            }
            | Msg::SwapSend {
                offer_coin,
                ask_denom,
                ..
            } => {
                validate_positive_coin(offer_coin)?;
                validate_denom(ask_denom)
                    .map_err(|err| Error::InvalidCoins(err.to_string()))?;
                if offer_coin.denom == *ask_denom {
                    return Err(Error::InvalidRequest(
                        "offer denom must differ from ask denom",
                    ));
                }
                Ok(())
            }
            Msg::InstantiateContract { funds, .. }
            | Msg::InstantiateContract2 { funds, .. }
            | Msg::ExecuteContract { funds, .. } => funds
                .validate()
                .map_err(|err| Error::InvalidCoins(err.to_string())),
            Msg::Delegate { amount, .. } | Msg::Undelegate { amount, .. } => {
                validate_positive_coin(amount)
            }
            Msg::EditValidator {
                commission_rate, ..
            } => match commission_rate {
                Some(rate) if rate.is_negative() || *rate > Dec::one() => {
                    Err(Error::InvalidRequest(
                        "commission rate must be between 0 and 1",
                    ))
                }
                _ => Ok(()),
            },
            Msg::AggregateExchangeRatePrevote { hash, .. } => {
                if hash.is_empty() {
                    return Err(Error::InvalidRequest("empty prevote hash"));
                }
                Ok(())
            }
            Msg::AggregateExchangeRateVote { exchange_rates, .. } => {
                if exchange_rates.is_empty() {
                    return Err(Error::InvalidRequest("empty exchange rates"));
                }
                Ok(())
            }
            Msg::Transfer {
                token,
                receiver,
                source_channel,
                ..
            } => {
                validate_positive_coin(token)?;
                if receiver.trim().is_empty() {
                    return Err(Error::InvalidRequest("missing receiver"));
                }
                if source_channel.is_empty() {
                    return Err(Error::InvalidRequest("missing source channel"));
                }
                Ok(())
            }
            Msg::Exec { msgs, .. } => {
                if depth >= MAX_AUTHZ_DEPTH {
                    return Err(Error::MaxDepth(MAX_AUTHZ_DEPTH));
                }
                if msgs.is_empty() {
                    return Err(Error::InvalidRequest(
                        "messages cannot be empty",
                    ));
                }
                msgs.iter().try_for_each(|msg| {
                    msg.validate_basic_at_depth(depth.saturating_add(1))
                })
            }
            Msg::SubmitProposal {
                initial_deposit, ..
            } => initial_deposit
                .validate()
                .map_err(|err| Error::InvalidCoins(err.to_string())),
            Msg::RecvPacket { .. }
            | Msg::Acknowledgement { .. }
            | Msg::Timeout { .. }
            | Msg::UpdateClient { .. }
            | Msg::Other { .. } => Ok(()),
        }
    }
}

/// Visit every message, descending into authz exec messages. Exec
/// messages themselves are visited before their inner messages. Fails when
/// nesting goes deeper than [`MAX_AUTHZ_DEPTH`].
pub fn visit_msgs<'a, E, F>(
    msgs: &'a [Msg],
    visit: &mut F,
) -> std::result::Result<(), E>
where
    F: FnMut(&'a Msg) -> std::result::Result<(), E>,
    E: From<Error>,
{
    visit_msgs_at_depth(msgs, 0, visit)
}

fn visit_msgs_at_depth<'a, E, F>(
    msgs: &'a [Msg],
    depth: usize,
    visit: &mut F,
) -> std::result::Result<(), E>
where
    F: FnMut(&'a Msg) -> std::result::Result<(), E>,
    E: From<Error>,
{
    for msg in msgs {
        visit(msg)?;
        if let Msg::Exec { msgs: inner, .. } = msg {
            if depth >= MAX_AUTHZ_DEPTH {
                return Err(Error::MaxDepth(MAX_AUTHZ_DEPTH).into());
            }
            visit_msgs_at_depth(inner, depth.saturating_add(1), visit)?;
        }
    }
    Ok(())
}

fn validate_positive_coin(coin: &Coin) -> Result<()> {
    validate_denom(&coin.denom)
        .map_err(|err| Error::InvalidCoins(err.to_string()))?;
    if coin.amount.is_zero() {
        return Err(Error::InvalidCoins(format!("{}", coin)));
    }
    Ok(())
}

fn validate_positive_coins(coins: &Coins) -> Result<()> {
    coins
        .validate()
        .map_err(|err| Error::InvalidCoins(err.to_string()))?;
    if coins.is_zero() {
        return Err(Error::InvalidCoins("empty coins".into()));
    }
    Ok(())
}

#[cfg(test)]
mod test_msgs {
    use assert_matches::assert_matches;
    use terra_core::address::testing::*;
    use terra_core::coin::testing::coins;

    use super::*;

    fn send(amount: &str) -> Msg {
        Msg::Send {
            from: address_1(),
            to: address_2(),
            amount: coins(amount),
        }
    }

    fn nest(msg: Msg, levels: usize) -> Msg {
        (0..levels).fold(msg, |inner, _| Msg::Exec {
            grantee: address_3(),
            msgs: vec![inner],
        })
    }

    #[test]
    fn test_send_requires_positive_amount() {
        assert_matches!(send("10uusd").validate_basic(), Ok(()));
        assert_matches!(send("").validate_basic(), Err(Error::InvalidCoins(_)));
    }

    #[test]
    fn test_multisend_must_balance() {
        let msg = Msg::MultiSend {
            inputs: vec![InputOutput {
                address: address_1(),
                coins: coins("10uusd"),
            }],
            outputs: vec![
                InputOutput {
                    address: address_2(),
                    coins: coins("4uusd"),
                },
                InputOutput {
                    address: address_3(),
                    coins: coins("5uusd"),
                },
            ],
        };
        assert_matches!(msg.validate_basic(), Err(Error::InvalidRequest(_)));
    }

    #[test]
    fn test_authz_depth_limit() {
        assert_matches!(
            nest(send("1uusd"), MAX_AUTHZ_DEPTH).validate_basic(),
            Ok(())
        );
        assert_matches!(
            nest(send("1uusd"), MAX_AUTHZ_DEPTH + 1).validate_basic(),
            Err(Error::MaxDepth(MAX_AUTHZ_DEPTH))
        );
    }

    #[test]
    fn test_visit_msgs_descends_into_exec() {
        let msgs = vec![nest(send("1uusd"), 2), send("2uusd")];
        let mut urls = vec![];
        visit_msgs::<Error, _>(&msgs, &mut |msg| {
            urls.push(msg.type_url().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(
            urls,
            vec![
                type_url::MSG_EXEC,
                type_url::MSG_EXEC,
                type_url::MSG_SEND,
                type_url::MSG_SEND
            ]
        );
        let too_deep = vec![nest(send("1uusd"), MAX_AUTHZ_DEPTH + 1)];
        assert_matches!(
            visit_msgs::<Error, _>(&too_deep, &mut |_| Ok(())),
            Err(Error::MaxDepth(_))
        );
    }

    #[test]
    fn test_edit_validator_rate_bounds() {
        let msg = |rate: &str| Msg::EditValidator {
            validator: address_1(),
            commission_rate: Some(rate.parse().unwrap()),
        };
        assert_matches!(msg("0.2").validate_basic(), Ok(()));
        assert_matches!(msg("1.5").validate_basic(), Err(_));
    }
}
