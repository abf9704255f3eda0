use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde_json::Value;

use crate::models::{ListenerState, Notice, PeerMessage};

/// Single POST endpoint of the direct-pairing listener. Moves go onto the
/// inbound queue; notices raise the matching one-shot signal.
pub async fn receive(req: HttpRequest, body: web::Bytes, state: web::Data<ListenerState>) -> HttpResponse {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("rejecting malformed body: {}", e);
            return HttpResponse::BadRequest().finish();
        }
    };

    match PeerMessage::classify(value) {
        Some(PeerMessage::Move(record)) => {
            info!("received move {} -> {}", record.from(), record.to());
            match state.moves.unbounded_send(record) {
                Ok(()) => HttpResponse::Ok().finish(),
                Err(e) => {
                    warn!("move queue closed: {}", e);
                    HttpResponse::InternalServerError().finish()
                }
            }
        }
        Some(PeerMessage::Notice(notice)) => {
            if notice == Notice::Connect {
                if let Some(addr) = req.peer_addr() {
                    if state.signals.record_peer(addr.ip()) {
                        info!("peer connected from {}", addr.ip());
                    }
                }
            }
            info!("received {:?}", notice);
            state.signals.raise(notice);
            HttpResponse::Ok().finish()
        }
        None => {
            warn!("rejecting unrecognized payload");
            HttpResponse::BadRequest().finish()
        }
    }
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::post().to(receive)));
}
