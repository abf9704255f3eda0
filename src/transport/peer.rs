use std::net::SocketAddr;
use std::time::Duration;

use actix_rt::Runtime;
use awc::Client;
use log::info;
use serde::Serialize;

use crate::error::TransportError;
use crate::models::Notice;
use crate::transport::{ensure_success, request_failed};

/// The opponent's direct-pairing listener.
#[derive(Clone)]
pub struct DirectPeer {
    client: Client,
    url: String,
}

impl DirectPeer {
    pub fn new(client: Client, addr: SocketAddr) -> Self {
        DirectPeer {
            client,
            url: format!("http://{}/", addr),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one JSON body and check for a success status.
    pub async fn post<T: Serialize>(&self, body: &T) -> Result<(), TransportError> {
        let response = self.client.post(self.url.as_str()).send_json(body).await.map_err(request_failed)?;
        ensure_success(response.status())
    }
}

/// Send the connect notice to a host, blocking the caller until it answers or
/// `timeout` passes.
pub fn handshake(addr: SocketAddr, timeout: Duration) -> Result<(), TransportError> {
    let runtime = Runtime::new()?;
    runtime.block_on(async move {
        let client = Client::builder().timeout(timeout).finish();
        let peer = DirectPeer::new(client, addr);
        peer.post(&Notice::Connect).await?;
        info!("handshake with {} accepted", peer.url());
        Ok(())
    })
}
