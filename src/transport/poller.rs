use std::time::Duration;

use actix::prelude::*;
use futures::channel::mpsc::UnboundedSender;
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::TransportError;
use crate::game::Color;
use crate::models::{MoveRecord, Offer};
use crate::transport::courier::Feeds;
use crate::transport::relay::RelayClient;
use crate::transport::signals::StopSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    pub interval: Duration,
    pub roster: Duration,
    pub latest_move: Duration,
    pub latest_offer: Duration,
    pub stop_check: Duration,
}

impl From<&Config> for PollTimings {
    fn from(config: &Config) -> Self {
        PollTimings {
            interval: config.poll_interval,
            roster: config.roster_timeout,
            latest_move: config.move_timeout,
            latest_offer: config.offer_timeout,
            stop_check: config.stop_check,
        }
    }
}

/// Remembers the last value read from each relay slot so that only changes
/// are forwarded. Empty slots are remembered but never forwarded.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    roster: Option<Vec<Color>>,
    latest_move: Option<MoveRecord>,
    latest_offer: Option<Offer>,
}

impl ChangeTracker {
    pub fn roster(&mut self, seen: Vec<Color>) -> Option<Vec<Color>> {
        if self.roster.as_ref() == Some(&seen) {
            return None;
        }
        self.roster = Some(seen.clone());
        Some(seen)
    }

    pub fn latest_move(&mut self, seen: Option<MoveRecord>) -> Option<MoveRecord> {
        if self.latest_move == seen {
            return None;
        }
        self.latest_move = seen.clone();
        seen
    }

    pub fn latest_offer(&mut self, seen: Option<Offer>) -> Option<Offer> {
        if self.latest_offer == seen {
            return None;
        }
        self.latest_offer = seen;
        seen
    }
}

/// Results of one polling cycle; each read succeeds or fails on its own.
pub struct Cycle {
    pub roster: Result<Vec<Color>, TransportError>,
    pub latest_move: Result<Option<MoveRecord>, TransportError>,
    pub latest_offer: Result<Option<Offer>, TransportError>,
}

/// Polls the relay's roster, move and offer slots on a fixed interval.
pub struct Poller {
    relay: RelayClient,
    feeds: Feeds,
    tracker: ChangeTracker,
    timings: PollTimings,
    stop: StopSignal,
    in_flight: bool,
}

impl Poller {
    pub fn new(relay: RelayClient, feeds: Feeds, timings: PollTimings, stop: StopSignal) -> Self {
        Poller {
            relay,
            feeds,
            tracker: ChangeTracker::default(),
            timings,
            stop,
            in_flight: false,
        }
    }

    fn poll(&mut self, ctx: &mut Context<Self>) {
        if self.in_flight {
            return;
        }
        self.in_flight = true;

        let relay = self.relay.clone();
        let timings = self.timings;
        let cycle = async move {
            let (roster, latest_move, latest_offer) = futures::join!(
                relay.roster(Some(timings.roster)),
                relay.latest_move(Some(timings.latest_move)),
                relay.latest_offer(Some(timings.latest_offer)),
            );
            Cycle {
                roster,
                latest_move,
                latest_offer,
            }
        };
        ctx.spawn(cycle.into_actor(self).map(|cycle, act, _ctx| {
            act.in_flight = false;
            act.absorb(cycle);
        }));
    }

    fn absorb(&mut self, cycle: Cycle) {
        match cycle.roster {
            Ok(seen) => {
                if let Some(roster) = self.tracker.roster(seen) {
                    info!("roster of room {} is now {:?}", self.relay.code(), roster);
                    forward(&self.feeds.roster, roster);
                }
            }
            Err(e) => warn!("roster poll failed: {}", e),
        }
        match cycle.latest_move {
            Ok(seen) => {
                if let Some(record) = self.tracker.latest_move(seen) {
                    info!("relay move {} -> {}", record.from(), record.to());
                    forward(&self.feeds.moves, record);
                }
            }
            Err(e) => warn!("move poll failed: {}", e),
        }
        match cycle.latest_offer {
            Ok(seen) => {
                if let Some(offer) = self.tracker.latest_offer(seen) {
                    info!("relay offer {:?}", offer);
                    forward(&self.feeds.offers, offer);
                }
            }
            Err(e) => warn!("offer poll failed: {}", e),
        }
    }
}

fn forward<T>(queue: &UnboundedSender<T>, value: T) {
    if queue.unbounded_send(value).is_err() {
        debug!("inbound queue closed, dropping update");
    }
}

impl Actor for Poller {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.timings.stop_check, |act, ctx| {
            if act.stop.is_raised() {
                debug!("poller stopping");
                ctx.stop();
            }
        });
        ctx.run_interval(self.timings.interval, |act, ctx| act.poll(ctx));
    }
}
