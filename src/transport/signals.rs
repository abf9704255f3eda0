use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Notice;

/// One-shot flags raised by the listener and consumed by the main loop.
#[derive(Debug, Default)]
pub struct PeerSignals {
    connected: AtomicBool,
    resign: AtomicBool,
    draw: AtomicBool,
    play_again: AtomicBool,
    peer: Mutex<Option<IpAddr>>,
}

impl PeerSignals {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, notice: Notice) -> &AtomicBool {
        match notice {
            Notice::Connect => &self.connected,
            Notice::Resign => &self.resign,
            Notice::Draw => &self.draw,
            Notice::PlayAgain => &self.play_again,
        }
    }

    /// Raising an already raised flag is a no-op.
    pub fn raise(&self, notice: Notice) {
        self.flag(notice).store(true, Ordering::SeqCst);
    }

    /// Read and clear.
    pub fn take(&self, notice: Notice) -> bool {
        self.flag(notice).swap(false, Ordering::SeqCst)
    }

    pub fn is_raised(&self, notice: Notice) -> bool {
        self.flag(notice).load(Ordering::SeqCst)
    }

    /// Remember the first peer that connected. Returns false when one is
    /// already known.
    pub fn record_peer(&self, ip: IpAddr) -> bool {
        let mut peer = self.peer.lock().unwrap_or_else(PoisonError::into_inner);
        if peer.is_some() {
            return false;
        }
        *peer = Some(ip);
        true
    }

    pub fn peer(&self) -> Option<IpAddr> {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every pending flag and forget the peer.
    pub fn reset(&self) {
        for notice in [Notice::Connect, Notice::Resign, Notice::Draw, Notice::PlayAgain] {
            self.take(notice);
        }
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Shared stop flag for background tasks. Each spawn gets a fresh one.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_clear_on_read() {
        let signals = PeerSignals::new();
        signals.raise(Notice::Draw);
        signals.raise(Notice::Draw);
        assert!(signals.is_raised(Notice::Draw));
        assert!(signals.take(Notice::Draw));
        assert!(!signals.take(Notice::Draw));
        assert!(!signals.take(Notice::Resign));
    }

    #[test]
    fn first_peer_wins() {
        let signals = PeerSignals::new();
        assert!(signals.record_peer("192.168.1.20".parse().unwrap()));
        assert!(!signals.record_peer("192.168.1.30".parse().unwrap()));
        assert_eq!(signals.peer(), Some("192.168.1.20".parse().unwrap()));
        signals.reset();
        assert_eq!(signals.peer(), None);
    }

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let stop = StopSignal::new();
        let seen_by_task = stop.clone();
        assert!(!seen_by_task.is_raised());
        stop.raise();
        assert!(seen_by_task.is_raised());
    }
}
