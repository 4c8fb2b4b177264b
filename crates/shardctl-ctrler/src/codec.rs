//! Wire encoding for controller commands.
//!
//! Commands travel through the consensus log as postcard bytes. The host
//! encodes on submission and [`crate::ShardCtrler::apply_bytes`] decodes on
//! apply.

use shardctl_types::{Command, Reply};

use crate::error::CtrlerError;

type Result<T> = std::result::Result<T, CtrlerError>;

/// Encode a command for the replication log.
pub fn encode(command: &Command) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(command)?)
}

/// Decode a command read back from the replication log.
pub fn decode(bytes: &[u8]) -> Result<Command> {
    Ok(postcard::from_bytes(bytes)?)
}

/// Encode a reply for the host's response path.
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(reply)?)
}

/// Decode a reply produced by [`encode_reply`].
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    Ok(postcard::from_bytes(bytes)?)
}
