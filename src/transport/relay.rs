use std::time::Duration;

use actix_rt::Runtime;
use awc::Client;
use log::{debug, info, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::TransportError;
use crate::game::Color;
use crate::models::{MoveRecord, Offer, RoomReply};
use crate::transport::{ensure_success, request_failed};

const ROOM_CODES: std::ops::RangeInclusive<u32> = 1000..=9999;

/// Client for one room on the relay service. Every endpoint hangs off the
/// site URL plus the room code.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    site: String,
    code: String,
}

impl RelayClient {
    pub fn new(client: Client, site: &str, code: &str) -> Self {
        RelayClient {
            client,
            site: site.to_string(),
            code: code.to_string(),
        }
    }

    /// Same connection pool, different room.
    pub fn with_code(&self, code: &str) -> Self {
        RelayClient::new(self.client.clone(), &self.site, code)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.site, self.code, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, timeout: Option<Duration>) -> Result<T, TransportError> {
        let mut request = self.client.get(self.url(path));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let mut response = request.send().await.map_err(request_failed)?;
        ensure_success(response.status())?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(path))
            .send_json(body)
            .await
            .map_err(request_failed)?;
        ensure_success(response.status())
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let response = self.client.delete(self.url(path)).send().await.map_err(request_failed)?;
        ensure_success(response.status())
    }

    /// True when the relay answered with the "Room created" message.
    pub async fn create_room(&self) -> Result<bool, TransportError> {
        let reply: RoomReply = self.get("/create", None).await?;
        Ok(reply.is_created())
    }

    pub async fn delete_room(&self) -> Result<(), TransportError> {
        let response = self.client.get(self.url("/delete")).send().await.map_err(request_failed)?;
        ensure_success(response.status())
    }

    pub async fn roster(&self, timeout: Option<Duration>) -> Result<Vec<Color>, TransportError> {
        self.get("/players", timeout).await
    }

    /// Overwrite the roster with `players`.
    pub async fn register(&self, players: &[Color]) -> Result<(), TransportError> {
        self.post("/players", &players).await
    }

    pub async fn unregister(&self) -> Result<(), TransportError> {
        self.delete("/players").await
    }

    pub async fn latest_move(&self, timeout: Option<Duration>) -> Result<Option<MoveRecord>, TransportError> {
        self.get("/latest-move", timeout).await
    }

    pub async fn post_move(&self, record: &MoveRecord) -> Result<(), TransportError> {
        self.post("/move", record).await
    }

    pub async fn clear_move(&self) -> Result<(), TransportError> {
        self.delete("/move").await
    }

    pub async fn latest_offer(&self, timeout: Option<Duration>) -> Result<Option<Offer>, TransportError> {
        self.get("/offer", timeout).await
    }

    pub async fn post_offer(&self, offer: &Offer) -> Result<(), TransportError> {
        self.post("/offer", offer).await
    }

    pub async fn clear_offer(&self) -> Result<(), TransportError> {
        self.delete("/offer").await
    }
}

/// Roster after `color` joins, or `None` when the room is full or already
/// holds that color.
pub fn admit(roster: &[Color], color: Color) -> Option<Vec<Color>> {
    if roster.len() >= 2 || roster.contains(&color) {
        return None;
    }
    let mut players = roster.to_vec();
    players.push(color);
    Some(players)
}

/// Blocking relay access for the main thread: room creation, joining, the
/// wait for an opponent and teardown on quit.
pub struct RelaySetup {
    runtime: Runtime,
    client: RelayClient,
    config: Config,
}

impl RelaySetup {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let runtime = Runtime::new()?;
        let client = runtime.block_on(async {
            let client = Client::builder().timeout(config.send_timeout).finish();
            RelayClient::new(client, &config.relay_url, "")
        });
        Ok(RelaySetup {
            runtime,
            client,
            config: config.clone(),
        })
    }

    pub fn code(&self) -> &str {
        self.client.code()
    }

    /// Try random codes until the relay creates a room, then register as
    /// White. Gives up after the configured number of attempts.
    pub fn create_room(&mut self) -> Result<String, TransportError> {
        let mut rng = rand::thread_rng();
        for _ in 0..self.config.create_attempts {
            let code = rng.gen_range(ROOM_CODES).to_string();
            let room = self.client.with_code(&code);
            match self.runtime.block_on(room.create_room()) {
                Ok(true) => {
                    self.runtime.block_on(room.register(&[Color::White]))?;
                    info!("created room {}", code);
                    self.client = room;
                    return Ok(code);
                }
                Ok(false) => debug!("room {} refused, trying another code", code),
                Err(e) => warn!("creating room {} failed: {}", code, e),
            }
        }
        Err(TransportError::NoRoom(self.config.create_attempts))
    }

    /// Join an existing room as `color`.
    pub fn join_room(&mut self, code: &str, color: Color) -> Result<(), TransportError> {
        let room = self.client.with_code(code.trim());
        let roster = match self.runtime.block_on(room.roster(Some(self.config.roster_timeout))) {
            Ok(roster) => roster,
            Err(e) => {
                debug!("roster of room {} unreadable: {}", code, e);
                return Err(TransportError::RoomNotFound);
            }
        };
        let players = admit(&roster, color).ok_or(TransportError::RoomFull)?;
        self.runtime.block_on(room.register(&players))?;
        info!("joined room {} as {}", room.code(), color.name());
        self.client = room;
        Ok(())
    }

    pub fn roster(&self) -> Result<Vec<Color>, TransportError> {
        self.runtime.block_on(self.client.roster(Some(self.config.roster_timeout)))
    }

    /// Remove our roster entry, empty both slots and delete the room. Each
    /// step is attempted even if an earlier one failed.
    pub fn teardown(&self) {
        let room = &self.client;
        let steps = self.runtime.block_on(async {
            [
                ("players", room.unregister().await),
                ("move", room.clear_move().await),
                ("offer", room.clear_offer().await),
                ("room", room.delete_room().await),
            ]
        });
        for (what, result) in steps {
            if let Err(e) = result {
                warn!("teardown of {} in room {} failed: {}", what, room.code(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_appends_to_a_free_room() {
        assert_eq!(admit(&[Color::White], Color::Black), Some(vec![Color::White, Color::Black]));
        assert_eq!(admit(&[], Color::Black), Some(vec![Color::Black]));
    }

    #[test]
    fn admit_refuses_full_rooms_and_taken_colors() {
        assert_eq!(admit(&[Color::White, Color::Black], Color::Black), None);
        assert_eq!(admit(&[Color::Black], Color::Black), None);
    }

    #[test]
    fn urls_join_site_code_and_path() {
        let runtime = Runtime::new().unwrap();
        let url = runtime.block_on(async {
            let relay = RelayClient::new(Client::default(), "https://relay.test/", "4821");
            relay.url("/latest-move")
        });
        assert_eq!(url, "https://relay.test/4821/latest-move");
    }
}
