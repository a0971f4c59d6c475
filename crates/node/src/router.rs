//! The message router. Only bank sends and IBC relays change state here;
//! the messages of every other module are accepted as they are.

use terra_core::address::Address;
use terra_core::coin::Coins;
use terra_core::event::{EmitEvents, Event};
use terra_ibc::ChannelState;
use terra_storage::{StorageRead, StorageWrite};
use terra_tx::{visit_msgs, InputOutput, Msg};
use thiserror::Error;

/// Type of the event emitted for every executed message
pub const MESSAGE_EVENT: &str = "message";

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("blocked address {0}")]
    BlockedAddress(Address),
    #[error("sum of inputs {inputs} does not match sum of outputs {outputs}")]
    InputOutputMismatch { inputs: Coins, outputs: Coins },
    #[error("channel {port_id}/{channel_id} is closed")]
    ChannelClosed { port_id: String, channel_id: String },
    #[error("{grantee} is not authorized to execute {type_url} for {granter}")]
    Unauthorized {
        granter: Address,
        grantee: Address,
        type_url: String,
    },
    #[error("{0}")]
    Account(#[from] terra_account::Error),
    #[error("{0}")]
    Storage(#[from] terra_storage::Error),
    #[error("{0}")]
    Bank(#[from] terra_bank::Error),
    #[error("{0}")]
    Ibc(#[from] terra_ibc::Error),
    #[error("{0}")]
    TxError(#[from] terra_tx::Error),
    #[error("Arithmetic overflow summing {0}")]
    Overflow(&'static str),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Execute the messages of a tx in order, descending into authz exec
/// messages. Every message nested in an exec must be granted to its grantee
/// by each of its signers. Fails on the first failing message; the caller
/// must discard the partial writes.
pub fn execute<S>(
    storage: &mut S,
    msgs: &[Msg],
    events: &mut Vec<Event>,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    visit_msgs(msgs, &mut |msg: &Msg| -> Result<()> {
        execute_msg(storage, msg)?;
        events.emit(
            Event::new(MESSAGE_EVENT).with("action", msg.type_url()),
        );
        Ok(())
    })
}

fn execute_msg<S>(storage: &mut S, msg: &Msg) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    match msg {
        Msg::Send { from, to, amount } => {
            check_not_blocked(to)?;
            terra_bank::send_coins(storage, from, to, amount)?;
            tracing::trace!(%from, %to, %amount, "Executed send");
        }
        Msg::MultiSend { inputs, outputs } => {
            let total_in = sum(inputs, "inputs")?;
            let total_out = sum(outputs, "outputs")?;
            if total_in != total_out {
                return Err(Error::InputOutputMismatch {
                    inputs: total_in,
                    outputs: total_out,
                });
            }
            for output in outputs {
                check_not_blocked(&output.address)?;
            }
            terra_bank::input_output_coins(
                storage,
                &pairs(inputs),
                &pairs(outputs),
            )?;
        }
        Msg::Transfer {
            source_port,
            source_channel,
            ..
        } => {
            let state = terra_ibc::read_channel_state(
                &*storage,
                source_port,
                source_channel,
            )?;
            if state == Some(ChannelState::Closed) {
                return Err(Error::ChannelClosed {
                    port_id: source_port.clone(),
                    channel_id: source_channel.clone(),
                });
            }
        }
        Msg::RecvPacket { .. }
        | Msg::Acknowledgement { .. }
        | Msg::Timeout { .. } => terra_ibc::record_relay(storage, msg)?,
        Msg::Exec { grantee, msgs } => {
            check_authorized(&*storage, grantee, msgs)?
        }
        _ => {
            tracing::trace!(
                type_url = msg.type_url(),
                "Passing message through"
            );
        }
    }
    Ok(())
}

fn check_authorized<S>(
    storage: &S,
    grantee: &Address,
    msgs: &[Msg],
) -> Result<()>
where
    S: StorageRead,
{
    let height = storage.get_block_height()?;
    for msg in msgs {
        for granter in msg.signers() {
            if granter == *grantee {
                continue;
            }
            let type_url = msg.type_url();
            if !terra_account::authz::is_authorized(
                storage, &granter, grantee, type_url, height,
            )? {
                return Err(Error::Unauthorized {
                    granter,
                    grantee: *grantee,
                    type_url: type_url.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_not_blocked(address: &Address) -> Result<()> {
    if terra_bank::is_blocked(address) {
        return Err(Error::BlockedAddress(*address));
    }
    Ok(())
}

fn sum(sides: &[InputOutput], what: &'static str) -> Result<Coins> {
    sides.iter().try_fold(Coins::new(), |acc, side| {
        acc.checked_add(&side.coins).ok_or(Error::Overflow(what))
    })
}

fn pairs(sides: &[InputOutput]) -> Vec<(Address, Coins)> {
    sides
        .iter()
        .map(|side| (side.address, side.coins.clone()))
        .collect()
}

#[cfg(test)]
mod test_router {
    use assert_matches::assert_matches;
    use terra_account::authz::{self, GenericAuthorization};
    use terra_core::address::testing::*;
    use terra_core::chain::BlockHeight;
    use terra_core::coin::testing::coins;
    use terra_storage::MockStore;
    use terra_tx::msg::type_url::MSG_SEND;
    use terra_tx::Packet;

    use super::*;

    fn funded() -> MockStore {
        let mut storage = MockStore::default();
        terra_bank::credit_tokens(
            &mut storage,
            &address_1(),
            &coins("1000uusd"),
        )
        .unwrap();
        storage
    }

    fn packet() -> Packet {
        Packet {
            sequence: 1,
            source_port: terra_ibc::TRANSFER_PORT.to_string(),
            source_channel: "channel-0".to_string(),
            destination_port: terra_ibc::TRANSFER_PORT.to_string(),
            destination_channel: "channel-1".to_string(),
            data: vec![],
        }
    }

    #[test]
    fn test_send_and_exec() {
        let mut storage = funded();
        authz::grant(
            &mut storage,
            &address_1(),
            &address_3(),
            GenericAuthorization {
                msg_type_url: MSG_SEND.to_string(),
                expiration: None,
            },
        )
        .unwrap();
        let mut events = vec![];
        let send = Msg::Send {
            from: address_1(),
            to: address_2(),
            amount: coins("100uusd"),
        };
        let exec = Msg::Exec {
            grantee: address_3(),
            msgs: vec![send.clone()],
        };
        execute(&mut storage, &[send, exec], &mut events).unwrap();
        assert_eq!(
            terra_bank::read_balances(&storage, &address_2()).unwrap(),
            coins("200uusd")
        );
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1].get("action"),
            Some(terra_tx::msg::type_url::MSG_EXEC)
        );
    }

    #[test]
    fn test_exec_without_grant_is_rejected() {
        let mut storage = funded();
        let exec = Msg::Exec {
            grantee: address_3(),
            msgs: vec![Msg::Send {
                from: address_1(),
                to: address_3(),
                amount: coins("1000uusd"),
            }],
        };
        assert_matches!(
            execute(&mut storage, &[exec.clone()], &mut vec![]),
            Err(Error::Unauthorized { granter, grantee, .. })
                if granter == address_1() && grantee == address_3()
        );
        assert_eq!(
            terra_bank::read_balances(&storage, &address_1()).unwrap(),
            coins("1000uusd")
        );

        // A grant for another message type doesn't help
        authz::grant(
            &mut storage,
            &address_1(),
            &address_3(),
            GenericAuthorization {
                msg_type_url: terra_tx::msg::type_url::MSG_DELEGATE
                    .to_string(),
                expiration: None,
            },
        )
        .unwrap();
        assert_matches!(
            execute(&mut storage, &[exec.clone()], &mut vec![]),
            Err(Error::Unauthorized { .. })
        );

        // Nor does an expired one
        authz::grant(
            &mut storage,
            &address_1(),
            &address_3(),
            GenericAuthorization {
                msg_type_url: MSG_SEND.to_string(),
                expiration: Some(BlockHeight(0)),
            },
        )
        .unwrap();
        storage.set_block_height(BlockHeight(1));
        assert_matches!(
            execute(&mut storage, &[exec], &mut vec![]),
            Err(Error::Unauthorized { .. })
        );
        assert!(
            terra_bank::read_balances(&storage, &address_3())
                .unwrap()
                .is_zero()
        );
    }

    #[test]
    fn test_send_to_module_account_is_blocked() {
        let mut storage = funded();
        let msg = Msg::Send {
            from: address_1(),
            to: *terra_bank::FEE_COLLECTOR,
            amount: coins("100uusd"),
        };
        let err = execute(&mut storage, &[msg], &mut vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("blocked address {}", *terra_bank::FEE_COLLECTOR)
        );
    }

    #[test]
    fn test_multi_send() {
        let mut storage = funded();
        let msg = Msg::MultiSend {
            inputs: vec![InputOutput {
                address: address_1(),
                coins: coins("300uusd"),
            }],
            outputs: vec![
                InputOutput {
                    address: address_2(),
                    coins: coins("100uusd"),
                },
                InputOutput {
                    address: address_3(),
                    coins: coins("200uusd"),
                },
            ],
        };
        execute(&mut storage, &[msg], &mut vec![]).unwrap();
        assert_eq!(
            terra_bank::read_balances(&storage, &address_1()).unwrap(),
            coins("700uusd")
        );
        assert_eq!(
            terra_bank::read_balances(&storage, &address_3()).unwrap(),
            coins("200uusd")
        );

        let unbalanced = Msg::MultiSend {
            inputs: vec![InputOutput {
                address: address_1(),
                coins: coins("300uusd"),
            }],
            outputs: vec![InputOutput {
                address: address_2(),
                coins: coins("100uusd"),
            }],
        };
        assert_matches!(
            execute(&mut storage, &[unbalanced], &mut vec![]),
            Err(Error::InputOutputMismatch { .. })
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let mut storage = funded();
        let msg = Msg::Send {
            from: address_1(),
            to: address_2(),
            amount: coins("1001uusd"),
        };
        assert_matches!(
            execute(&mut storage, &[msg], &mut vec![]),
            Err(Error::Bank(terra_bank::Error::InsufficientFunds { .. }))
        );
    }

    #[test]
    fn test_relays_are_recorded() {
        let mut storage = MockStore::default();
        let msg = Msg::RecvPacket {
            packet: packet(),
            signer: address_1(),
        };
        assert!(!terra_ibc::is_redundant(&storage, &msg).unwrap());
        execute(&mut storage, &[msg.clone()], &mut vec![]).unwrap();
        assert!(terra_ibc::is_redundant(&storage, &msg).unwrap());
    }

    #[test]
    fn test_transfer_on_closed_channel() {
        let mut storage = MockStore::default();
        let msg = Msg::Transfer {
            source_port: terra_ibc::TRANSFER_PORT.to_string(),
            source_channel: "channel-1".to_string(),
            token: terra_core::coin::Coin::new("uluna", 10_u64),
            sender: address_1(),
            receiver: "osmo1receiver".to_string(),
            timeout_height: 0,
            memo: String::new(),
        };
        execute(&mut storage, &[msg.clone()], &mut vec![]).unwrap();
        terra_ibc::write_channel_state(
            &mut storage,
            terra_ibc::TRANSFER_PORT,
            "channel-1",
            ChannelState::Closed,
        )
        .unwrap();
        assert_matches!(
            execute(&mut storage, &[msg], &mut vec![]),
            Err(Error::ChannelClosed { .. })
        );
    }
}
