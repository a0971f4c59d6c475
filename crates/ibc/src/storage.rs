//! Functions for IBC-related data to access the storage

use terra_core::storage::{self as key, Key};
use terra_tx::msg::Packet;

const IBC_SEG: &str = "ibc";
const CHANNEL_ENDS_SEG: &str = "channelEnds";
const RECEIPTS_SEG: &str = "receipts";
const ACKS_SEG: &str = "acks";
const PORTS_SEG: &str = "ports";
const CHANNELS_SEG: &str = "channels";
const SEQUENCES_SEG: &str = "sequences";

/// Returns the root of the IBC-related data
pub fn ibc_prefix() -> Key {
    Key::from_seg(&IBC_SEG)
}

fn port_channel_key(
    prefix: &str,
    port_id: &str,
    channel_id: &str,
) -> key::Result<Key> {
    ibc_prefix()
        .push(&prefix)
        .push(&PORTS_SEG)
        .push_checked(&port_id)?
        .push(&CHANNELS_SEG)
        .push_checked(&channel_id)
}

/// Returns a key for the channel end
pub fn channel_key(port_id: &str, channel_id: &str) -> key::Result<Key> {
    port_channel_key(CHANNEL_ENDS_SEG, port_id, channel_id)
}

/// Returns a key for the receipt of a packet on its destination channel
pub fn receipt_key(packet: &Packet) -> key::Result<Key> {
    Ok(port_channel_key(
        RECEIPTS_SEG,
        &packet.destination_port,
        &packet.destination_channel,
    )?
    .push(&SEQUENCES_SEG)
    .push(&packet.sequence))
}

/// Returns a key marking a packet as settled on its source channel, either
/// acknowledged or timed out
pub fn settled_key(packet: &Packet) -> key::Result<Key> {
    Ok(port_channel_key(
        ACKS_SEG,
        &packet.source_port,
        &packet.source_channel,
    )?
    .push(&SEQUENCES_SEG)
    .push(&packet.sequence))
}
