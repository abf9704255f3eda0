use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use actix::prelude::*;
use awc::Client;
use futures::channel::mpsc::UnboundedSender;
use futures::channel::oneshot;
use futures::executor::block_on;
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::TransportError;
use crate::game::Color;
use crate::models::{MoveRecord, Offer, Parcel};
use crate::transport::peer::DirectPeer;
use crate::transport::poller::{PollTimings, Poller};
use crate::transport::relay::RelayClient;
use crate::transport::signals::StopSignal;

/// Where outbound parcels go. Built on the worker thread, since the HTTP
/// client is tied to it.
#[derive(Clone)]
pub enum Route {
    Direct(DirectPeer),
    Relay(RelayClient),
}

impl Route {
    async fn deliver(self, parcel: Parcel) -> Result<(), TransportError> {
        match (self, parcel) {
            (Route::Direct(peer), Parcel::Move(record)) => peer.post(&record).await,
            (Route::Direct(peer), Parcel::Offer(offer)) => peer.post(&offer).await,
            // The listener has no slots to clear.
            (Route::Direct(_), Parcel::ClearMove | Parcel::ClearOffer) => Ok(()),
            (Route::Relay(relay), Parcel::Move(record)) => relay.post_move(&record).await,
            (Route::Relay(relay), Parcel::Offer(offer)) => relay.post_offer(&offer).await,
            (Route::Relay(relay), Parcel::ClearMove) => relay.clear_move().await,
            (Route::Relay(relay), Parcel::ClearOffer) => relay.clear_offer().await,
        }
    }
}

/// Thread-safe description of a route, handed to the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Direct(SocketAddr),
    Relay { site: String, code: String },
}

/// Sends parcels one at a time, in arrival order. Failures are logged and
/// not retried.
pub struct Courier {
    route: Route,
    stop: StopSignal,
    stop_check: Duration,
}

impl Courier {
    pub fn new(route: Route, stop: StopSignal, stop_check: Duration) -> Self {
        Courier { route, stop, stop_check }
    }
}

impl Actor for Courier {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.stop_check, |act, ctx| {
            if act.stop.is_raised() {
                debug!("courier stopping");
                ctx.stop();
                System::current().stop();
            }
        });
    }
}

impl Handler<Parcel> for Courier {
    type Result = ();

    fn handle(&mut self, parcel: Parcel, ctx: &mut Self::Context) {
        let route = self.route.clone();
        let label = format!("{:?}", parcel);
        let send = async move {
            match route.deliver(parcel).await {
                Ok(()) => debug!("delivered {}", label),
                Err(e) => warn!("could not deliver {}: {}", label, e),
            }
        };
        // Hold the mailbox until this send finishes so parcels stay in order.
        ctx.wait(send.into_actor(self));
    }
}

/// Main-thread handle for queueing outbound parcels.
pub trait Outbox {
    fn deliver(&self, parcel: Parcel);
}

impl Outbox for Addr<Courier> {
    fn deliver(&self, parcel: Parcel) {
        self.do_send(parcel);
    }
}

impl Outbox for UnboundedSender<Parcel> {
    fn deliver(&self, parcel: Parcel) {
        if let Err(e) = self.unbounded_send(parcel) {
            debug!("outbox closed: {}", e);
        }
    }
}

/// Inbound queues the relay poller feeds.
#[derive(Clone)]
pub struct Feeds {
    pub moves: UnboundedSender<MoveRecord>,
    pub offers: UnboundedSender<Offer>,
    pub roster: UnboundedSender<Vec<Color>>,
}

/// Start the background worker: a courier for `target`, plus a relay poller
/// when `feeds` is given. Both stop once `stop` is raised.
pub fn spawn_worker(
    target: Target,
    feeds: Option<Feeds>,
    config: &Config,
    stop: StopSignal,
) -> Result<Addr<Courier>, TransportError> {
    let (tx, rx) = oneshot::channel();
    let send_timeout = config.send_timeout;
    let stop_check = config.stop_check;
    let timings = PollTimings::from(config);

    thread::Builder::new()
        .name("chess-courier".to_string())
        .spawn(move || {
            let system = System::new();
            system.block_on(async move {
                let client = Client::builder().timeout(send_timeout).finish();
                let route = match target {
                    Target::Direct(addr) => Route::Direct(DirectPeer::new(client, addr)),
                    Target::Relay { site, code } => Route::Relay(RelayClient::new(client, &site, &code)),
                };
                if let (Some(feeds), Route::Relay(relay)) = (feeds, &route) {
                    Poller::new(relay.clone(), feeds, timings, stop.clone()).start();
                }
                let courier = Courier::new(route, stop, stop_check).start();
                let _ = tx.send(courier);
            });
            if let Err(e) = system.run() {
                warn!("worker system exited with error: {}", e);
            }
            info!("worker stopped");
        })?;

    block_on(rx).map_err(|_| TransportError::Worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::StreamExt;

    #[test]
    fn channel_outbox_queues_in_order() {
        let (tx, mut rx) = mpsc::unbounded();
        tx.deliver(Parcel::ClearMove);
        tx.deliver(Parcel::ClearOffer);
        block_on(async {
            assert_eq!(rx.next().await, Some(Parcel::ClearMove));
            assert_eq!(rx.next().await, Some(Parcel::ClearOffer));
        });
    }

    #[actix_rt::test]
    async fn direct_route_skips_slot_clearing() {
        let peer = DirectPeer::new(Client::default(), "127.0.0.1:9".parse().unwrap());
        assert!(Route::Direct(peer.clone()).deliver(Parcel::ClearMove).await.is_ok());
        assert!(Route::Direct(peer).deliver(Parcel::ClearOffer).await.is_ok());
    }
}
