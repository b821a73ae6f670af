//! Inbound commands to the application service.
//!
//! Produced by the command dispatcher ([`rpc::codec`](crate::rpc::codec))
//! from MQTT payloads and interpreted by the
//! [`AppService`](super::service::AppService).

use crate::locker::{Channel, LockerId};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Unlock `channel` for the fixed open duration.
    OpenLocker { locker_id: LockerId, channel: Channel },

    /// Re-lock `channel` ahead of its timer.
    CloseLocker { channel: Channel },
}
