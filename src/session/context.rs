use std::net::SocketAddr;
use std::sync::Arc;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::info;

use crate::config::Config;
use crate::error::TransportError;
use crate::game::Color;
use crate::models::{ListenerState, MoveRecord, Offer, Parcel};
use crate::transport::{spawn_worker, Feeds, Listener, Outbox, PeerSignals, RelaySetup, StopSignal, Target};

/// Everything the session shares with the background tasks: inbound queues,
/// one-shot signals, the listener, the outbox and the current stop signal.
pub struct SessionContext {
    pub config: Config,
    signals: Arc<PeerSignals>,
    moves: (UnboundedSender<MoveRecord>, UnboundedReceiver<MoveRecord>),
    offers: (UnboundedSender<Offer>, UnboundedReceiver<Offer>),
    roster: (UnboundedSender<Vec<Color>>, UnboundedReceiver<Vec<Color>>),
    listener: Option<Listener>,
    outbox: Option<Box<dyn Outbox>>,
    stop: StopSignal,
    relay: Option<RelaySetup>,
}

fn next_ready<T>(rx: &mut UnboundedReceiver<T>) -> Option<T> {
    rx.try_recv().ok()
}

fn drain<T>(rx: &mut UnboundedReceiver<T>) -> usize {
    let mut dropped = 0;
    while next_ready(rx).is_some() {
        dropped += 1;
    }
    dropped
}

impl SessionContext {
    pub fn new(config: Config) -> Self {
        SessionContext {
            config,
            signals: Arc::new(PeerSignals::new()),
            moves: mpsc::unbounded(),
            offers: mpsc::unbounded(),
            roster: mpsc::unbounded(),
            listener: None,
            outbox: None,
            stop: StopSignal::new(),
            relay: None,
        }
    }

    pub fn signals(&self) -> Arc<PeerSignals> {
        Arc::clone(&self.signals)
    }

    pub fn move_sender(&self) -> UnboundedSender<MoveRecord> {
        self.moves.0.clone()
    }

    pub fn offer_sender(&self) -> UnboundedSender<Offer> {
        self.offers.0.clone()
    }

    pub fn roster_sender(&self) -> UnboundedSender<Vec<Color>> {
        self.roster.0.clone()
    }

    pub fn next_move(&mut self) -> Option<MoveRecord> {
        next_ready(&mut self.moves.1)
    }

    pub fn next_offer(&mut self) -> Option<Offer> {
        next_ready(&mut self.offers.1)
    }

    pub fn next_roster(&mut self) -> Option<Vec<Color>> {
        next_ready(&mut self.roster.1)
    }

    pub fn drain_moves(&mut self) -> usize {
        drain(&mut self.moves.1)
    }

    /// Empty every inbound queue and clear pending signals.
    pub fn drain_all(&mut self) {
        drain(&mut self.moves.1);
        drain(&mut self.offers.1);
        drain(&mut self.roster.1);
        self.signals.reset();
    }

    pub fn set_outbox<O: Outbox + 'static>(&mut self, outbox: O) {
        self.outbox = Some(Box::new(outbox));
    }

    pub fn has_outbox(&self) -> bool {
        self.outbox.is_some()
    }

    pub fn deliver(&self, parcel: Parcel) {
        if let Some(outbox) = &self.outbox {
            outbox.deliver(parcel);
        }
    }

    /// Start the direct-pairing listener unless it is already running.
    pub fn start_listener(&mut self) -> Result<(), TransportError> {
        if self.listener.is_some() {
            return Ok(());
        }
        let state = ListenerState {
            moves: self.move_sender(),
            signals: self.signals(),
        };
        self.listener = Some(Listener::spawn(self.config.port, state)?);
        Ok(())
    }

    pub fn stop_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
    }

    fn start_worker(&mut self, target: Target, feeds: Option<Feeds>) -> Result<(), TransportError> {
        self.stop = StopSignal::new();
        let courier = spawn_worker(target, feeds, &self.config, self.stop.clone())?;
        self.outbox = Some(Box::new(courier));
        Ok(())
    }

    /// Courier towards the opponent's listener.
    pub fn start_direct(&mut self, peer: SocketAddr) -> Result<(), TransportError> {
        info!("sending to peer listener at {}", peer);
        self.start_worker(Target::Direct(peer), None)
    }

    /// Courier and poller for the joined relay room.
    pub fn start_relay(&mut self) -> Result<(), TransportError> {
        let code = match &self.relay {
            Some(relay) => relay.code().to_string(),
            None => return Err(TransportError::RoomNotFound),
        };
        let feeds = Feeds {
            moves: self.move_sender(),
            offers: self.offer_sender(),
            roster: self.roster_sender(),
        };
        let target = Target::Relay {
            site: self.config.relay_url.clone(),
            code,
        };
        // An earlier poller may have pushed one last update before it stopped.
        self.drain_all();
        self.start_worker(target, Some(feeds))
    }

    /// Raise the current stop signal and drop the outbox. Tasks wind down on
    /// their own.
    pub fn stop_worker(&mut self) {
        self.stop.raise();
        self.outbox = None;
    }

    pub fn relay(&mut self) -> Result<&mut RelaySetup, TransportError> {
        if self.relay.is_none() {
            self.relay = Some(RelaySetup::new(&self.config)?);
        }
        self.relay.as_mut().ok_or(TransportError::Worker)
    }

    pub fn relay_ref(&self) -> Option<&RelaySetup> {
        self.relay.as_ref()
    }

    pub fn forget_relay(&mut self) -> Option<RelaySetup> {
        self.relay.take()
    }
}
