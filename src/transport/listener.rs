use std::net::SocketAddr;
use std::thread;

use actix::System;
use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use futures::channel::oneshot;
use futures::executor::block_on;
use log::{info, warn};

use crate::error::TransportError;
use crate::models::ListenerState;
use crate::routes::configure_routes;

/// Handle to the direct-pairing listener running on its own thread.
pub struct Listener {
    handle: ServerHandle,
    addrs: Vec<SocketAddr>,
}

impl Listener {
    /// Bind `0.0.0.0:port` and serve on a dedicated thread. Returns once the
    /// socket is bound, or with the bind error.
    pub fn spawn(port: u16, state: ListenerState) -> Result<Listener, TransportError> {
        let (tx, rx) = oneshot::channel();
        let data = web::Data::new(state);

        thread::Builder::new()
            .name("chess-listener".to_string())
            .spawn(move || {
                System::new().block_on(async move {
                    let bound = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure_routes))
                        .workers(1)
                        .disable_signals()
                        .bind(("0.0.0.0", port));
                    match bound {
                        Ok(server) => {
                            let addrs = server.addrs();
                            let server = server.run();
                            if tx.send(Ok((server.handle(), addrs))).is_err() {
                                return;
                            }
                            if let Err(e) = server.await {
                                warn!("listener stopped with error: {}", e);
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                        }
                    }
                });
            })?;

        let (handle, addrs) = block_on(rx).map_err(|_| TransportError::Worker)??;
        info!("listening on {:?}", addrs);
        Ok(Listener { handle, addrs })
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Bound port, useful when spawned on port 0.
    pub fn port(&self) -> Option<u16> {
        self.addrs.first().map(SocketAddr::port)
    }

    pub fn stop(&self) {
        block_on(self.handle.stop(false));
        info!("listener stopped");
    }
}
