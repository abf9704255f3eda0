//! Network adapters: the direct-pairing listener, the outbound courier, the
//! relay poller and the blocking helpers the main thread uses during setup.

pub mod courier;
pub mod listener;
pub mod peer;
pub mod poller;
pub mod relay;
pub mod signals;

use awc::error::SendRequestError;
use awc::http::StatusCode;

use crate::error::TransportError;

pub use courier::{spawn_worker, Courier, Feeds, Outbox, Route, Target};
pub use listener::Listener;
pub use peer::DirectPeer;
pub use poller::{ChangeTracker, Poller};
pub use relay::{RelayClient, RelaySetup};
pub use signals::{PeerSignals, StopSignal};

pub(crate) fn request_failed(e: SendRequestError) -> TransportError {
    TransportError::Request(e.to_string())
}

pub(crate) fn ensure_success(status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status(status.as_u16()))
    }
}
