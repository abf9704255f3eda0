use std::sync::Arc;

use futures::channel::mpsc::UnboundedSender;

use crate::models::MoveRecord;
use crate::transport::signals::PeerSignals;

/// State shared with the direct-pairing listener's handlers.
pub struct ListenerState {
    pub moves: UnboundedSender<MoveRecord>,
    pub signals: Arc<PeerSignals>,
}
