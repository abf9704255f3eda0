//! The session state machine: mode selection, pairing, play, promotion,
//! game over and rematch. It runs on the main thread and is driven by
//! [`Session::tick`].

pub mod context;

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::TransportError;
use crate::game::{legal_destinations, Color, Outcome, PieceKind, Square};
use crate::models::{GameState, MoveRecord, Notice, Offer, OfferKind, Parcel};
use crate::transport::peer::handshake;

pub use context::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStep {
    Choosing,
    /// Listener is up; waiting for the joiner's connect notice.
    Hosting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineStep {
    Choosing,
    /// Registered in a room; waiting for a second player.
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    LocalSetup(LocalStep),
    OnlineSetup(OnlineStep),
    Normal,
    PromotionPending,
    GameOver(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Direct pairing over the local network.
    Local,
    /// Through a relay room.
    Online,
    /// Both sides on this machine.
    Hotseat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ChooseLocal,
    ChooseOnline,
    Hotseat,
    Host,
    JoinHost(IpAddr),
    CreateRoom,
    JoinRoom(String),
    Move { from: Square, to: Square },
    Promote(PieceKind),
    Resign,
    OfferDraw,
    PlayAgain,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    id: Uuid,
    phase: Phase,
    mode: Option<Mode>,
    color: Color,
    /// `None` in hotseat, where whoever is to move may move.
    holds_move: Option<bool>,
    game: GameState,
    dirty: bool,
    last_roster_check: Option<Instant>,
    notices: VecDeque<String>,
    ctx: SessionContext,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self::with_context(SessionContext::new(config))
    }

    pub fn with_context(ctx: SessionContext) -> Self {
        let id = Uuid::new_v4();
        info!("[{}] session started", id);
        Session {
            id,
            phase: Phase::Setup,
            mode: None,
            color: Color::White,
            holds_move: None,
            game: GameState::new(),
            dirty: false,
            last_roster_check: None,
            notices: VecDeque::new(),
            ctx,
        }
    }

    /// A session that is already paired and playing. The context's outbox
    /// and queues are used as they are.
    pub fn paired(mode: Mode, color: Color, ctx: SessionContext) -> Self {
        let mut session = Self::with_context(ctx);
        session.begin_game(mode, color);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn holds_move(&self) -> Option<bool> {
        self.holds_move
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    /// Next message for the player, oldest first.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notices.pop_front()
    }

    fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {}", self.id, message);
        self.notices.push_back(message);
    }

    /// Legal targets for the piece on `from`, if the local side may move it.
    pub fn legal_targets(&self, from: Square) -> Vec<Square> {
        match self.game.board.piece_at(from) {
            Some(piece) if self.phase == Phase::Normal && self.may_move(piece.color) => {
                legal_destinations(from, &self.game.board)
            }
            _ => Vec::new(),
        }
    }

    fn may_move(&self, color: Color) -> bool {
        if color != self.game.turn {
            return false;
        }
        match self.holds_move {
            None => true,
            Some(holds) => holds && color == self.color,
        }
    }

    /// One main-loop step: setup progress, at most one item from each
    /// inbound queue, at most one command, then end-condition evaluation.
    pub fn tick(&mut self, command: Option<Command>) -> Flow {
        self.advance_setup();
        self.drain_inbound();
        if let Some(command) = command {
            if self.handle(command) == Flow::Quit {
                self.teardown();
                return Flow::Quit;
            }
        }
        self.evaluate();
        Flow::Continue
    }

    fn begin_game(&mut self, mode: Mode, color: Color) {
        self.mode = Some(mode);
        self.color = color;
        self.game = GameState::new();
        self.holds_move = match mode {
            Mode::Hotseat => None,
            Mode::Local | Mode::Online => Some(color == Color::White),
        };
        self.dirty = false;
        self.phase = Phase::Normal;
        info!("[{}] game started in {:?} mode as {}", self.id, mode, color.name());
    }

    fn advance_setup(&mut self) {
        match self.phase {
            Phase::LocalSetup(LocalStep::Hosting) => {
                let signals = self.ctx.signals();
                if !signals.take(Notice::Connect) {
                    return;
                }
                let Some(ip) = signals.peer() else {
                    warn!("[{}] connect notice without a peer address", self.id);
                    return;
                };
                let peer = SocketAddr::new(ip, self.ctx.config.port);
                match self.ctx.start_direct(peer) {
                    Ok(()) => {
                        self.notify(format!("Opponent connected from {}", ip));
                        self.begin_game(Mode::Local, Color::White);
                    }
                    Err(e) => warn!("[{}] could not start courier: {}", self.id, e),
                }
            }
            Phase::OnlineSetup(OnlineStep::Waiting) => {
                let interval = self.ctx.config.poll_interval;
                if self.last_roster_check.map_or(false, |at| at.elapsed() < interval) {
                    return;
                }
                self.last_roster_check = Some(Instant::now());
                let roster = match self.ctx.relay_ref().map(|relay| relay.roster()) {
                    Some(Ok(roster)) => roster,
                    Some(Err(e)) => {
                        debug!("[{}] roster check failed: {}", self.id, e);
                        return;
                    }
                    None => return,
                };
                if roster.len() < 2 {
                    return;
                }
                match self.ctx.start_relay() {
                    Ok(()) => {
                        self.notify("Opponent joined");
                        self.begin_game(Mode::Online, self.color);
                    }
                    Err(e) => warn!("[{}] could not start relay tasks: {}", self.id, e),
                }
            }
            _ => {}
        }
    }

    fn in_game(&self) -> bool {
        matches!(self.phase, Phase::Normal | Phase::PromotionPending | Phase::GameOver(_))
    }

    fn drain_inbound(&mut self) {
        if !self.in_game() {
            return;
        }
        match self.mode {
            Some(Mode::Online) => {
                if let Some(roster) = self.ctx.next_roster() {
                    if roster.len() < 2 {
                        self.opponent_lost();
                        return;
                    }
                }
                if let Some(offer) = self.ctx.next_offer() {
                    self.receive_offer(offer);
                }
            }
            Some(Mode::Local) => self.receive_signals(),
            Some(Mode::Hotseat) | None => return,
        }
        if self.phase == Phase::Normal && self.holds_move == Some(false) {
            if let Some(record) = self.ctx.next_move() {
                self.receive_move(record);
            }
        }
    }

    fn receive_move(&mut self, record: MoveRecord) {
        if self.game.last_move.as_ref() == Some(&record) {
            debug!("[{}] ignoring echo of our own move", self.id);
            return;
        }
        if record.fifty_move != self.game.halfmove_clock {
            warn!(
                "[{}] half-move counters disagree: peer {} vs local {}",
                self.id, record.fifty_move, self.game.halfmove_clock
            );
        }
        match self.game.play(&record) {
            Ok(_) => {
                info!("[{}] opponent played {} -> {}", self.id, record.from(), record.to());
                self.holds_move = Some(true);
                self.dirty = true;
            }
            Err(e) => warn!("[{}] dropping inbound move: {}", self.id, e),
        }
    }

    fn receive_offer(&mut self, offer: Offer) {
        if offer.color == self.color {
            return;
        }
        self.apply_offer(offer.kind, offer.color);
        self.ctx.deliver(Parcel::ClearOffer);
    }

    fn receive_signals(&mut self) {
        let signals = self.ctx.signals();
        let opponent = self.color.opponent();
        if signals.take(Notice::Resign) {
            self.apply_offer(OfferKind::Resign, opponent);
        }
        if signals.take(Notice::Draw) {
            self.apply_offer(OfferKind::Draw, opponent);
        }
        if signals.take(Notice::PlayAgain) {
            self.apply_offer(OfferKind::PlayAgain, opponent);
        }
    }

    fn apply_offer(&mut self, kind: OfferKind, from: Color) {
        match (kind, self.phase) {
            (OfferKind::PlayAgain, Phase::GameOver(_)) => {
                self.notify(format!("{} wants a rematch", from.name()));
                self.rematch(false);
            }
            (OfferKind::PlayAgain, _) => debug!("[{}] rematch request outside game over", self.id),
            (_, Phase::GameOver(_)) => debug!("[{}] {:?} after game over", self.id, kind),
            (OfferKind::Resign, _) => {
                self.game.resigned = Some(from);
                self.dirty = true;
            }
            (OfferKind::Draw, _) => {
                self.notify(format!("{} offers a draw", from.name()));
                self.game.draw_offers.insert(from);
                self.dirty = true;
            }
        }
    }

    fn handle(&mut self, command: Command) -> Flow {
        match (self.phase, command) {
            (_, Command::Quit) => return Flow::Quit,

            (Phase::Setup, Command::ChooseLocal) => {
                self.mode = Some(Mode::Local);
                self.phase = Phase::LocalSetup(LocalStep::Choosing);
            }
            (Phase::Setup, Command::ChooseOnline) => {
                self.mode = Some(Mode::Online);
                self.phase = Phase::OnlineSetup(OnlineStep::Choosing);
            }
            (Phase::Setup, Command::Hotseat) => self.begin_game(Mode::Hotseat, Color::White),

            (Phase::LocalSetup(LocalStep::Choosing), Command::Host) => self.host(),
            (Phase::LocalSetup(LocalStep::Choosing), Command::JoinHost(ip)) => self.join_host(ip),
            (Phase::OnlineSetup(OnlineStep::Choosing), Command::CreateRoom) => self.create_room(),
            (Phase::OnlineSetup(OnlineStep::Choosing), Command::JoinRoom(code)) => self.join_room(&code),

            (Phase::Normal, Command::Move { from, to }) => self.local_move(from, to),
            (Phase::PromotionPending, Command::Promote(kind)) => self.promote(kind),
            (Phase::Normal | Phase::PromotionPending, Command::Resign) => self.resign(),
            (Phase::Normal | Phase::PromotionPending, Command::OfferDraw) => self.offer_draw(),
            (Phase::GameOver(_), Command::PlayAgain) => self.rematch(true),

            (phase, command) => debug!("[{}] {:?} ignored in {:?}", self.id, command, phase),
        }
        Flow::Continue
    }

    fn host(&mut self) {
        match self.ctx.start_listener() {
            Ok(()) => {
                self.color = Color::White;
                self.phase = Phase::LocalSetup(LocalStep::Hosting);
                self.notify(format!(
                    "Waiting for opponent at {}:{}",
                    outward_ip().map_or_else(|| "this machine".to_string(), |ip| ip.to_string()),
                    self.ctx.config.port
                ));
            }
            Err(e) => self.notify(format!("Could not start listener: {}", e)),
        }
    }

    fn join_host(&mut self, ip: IpAddr) {
        let host = SocketAddr::new(ip, self.ctx.config.port);
        match self.connect_to_host(host) {
            Ok(()) => {
                self.notify(format!("Connected to {}", host));
                self.begin_game(Mode::Local, Color::Black);
            }
            Err(e) => {
                self.ctx.stop_listener();
                self.notify(format!("Could not connect to {}: {}", host, e));
            }
        }
    }

    /// Our own listener first, so the host's first reply has somewhere to go.
    fn connect_to_host(&mut self, host: SocketAddr) -> Result<(), TransportError> {
        self.ctx.start_listener()?;
        handshake(host, self.ctx.config.connect_timeout)?;
        self.ctx.start_direct(host)
    }

    fn create_room(&mut self) {
        match self.ctx.relay().and_then(|relay| relay.create_room()) {
            Ok(code) => {
                self.color = Color::White;
                self.phase = Phase::OnlineSetup(OnlineStep::Waiting);
                self.notify(format!("Room code: {}", code));
            }
            Err(e) => self.notify(format!("Could not create a room: {}", e)),
        }
    }

    fn join_room(&mut self, code: &str) {
        match self.ctx.relay().and_then(|relay| relay.join_room(code, Color::Black)) {
            Ok(()) => {
                self.color = Color::Black;
                self.phase = Phase::OnlineSetup(OnlineStep::Waiting);
                self.notify("Waiting for opponent...");
            }
            Err(TransportError::RoomFull) => self.notify("Room is full"),
            Err(TransportError::RoomNotFound) => self.notify("Room not found"),
            Err(e) => self.notify(format!("Could not join room: {}", e)),
        }
    }

    fn local_move(&mut self, from: Square, to: Square) {
        let Some(piece) = self.game.board.piece_at(from) else {
            debug!("[{}] no piece on {}", self.id, from);
            return;
        };
        if !self.may_move(piece.color) {
            debug!("[{}] not ours to move: {}", self.id, from);
            return;
        }
        if !legal_destinations(from, &self.game.board).contains(&to) {
            self.notify(format!("Illegal move {}{}", from, to));
            return;
        }

        let record = MoveRecord::new(from, to, self.game.halfmove_clock);
        match self.game.play_local(&record) {
            Ok(played) if played.promotion_due => {
                self.phase = Phase::PromotionPending;
                self.notify("Choose a promotion piece: q, r, b or n");
            }
            Ok(_) => self.finish_local_move(record),
            Err(e) => warn!("[{}] could not apply {}{}: {}", self.id, from, to, e),
        }
    }

    fn promote(&mut self, kind: PieceKind) {
        if let Some(record) = self.game.promote(kind) {
            self.phase = Phase::Normal;
            self.finish_local_move(record);
        }
    }

    fn finish_local_move(&mut self, record: MoveRecord) {
        info!("[{}] played {} -> {}", self.id, record.from(), record.to());
        self.ctx.deliver(Parcel::Move(record));
        if let Some(holds) = self.holds_move.as_mut() {
            *holds = false;
        }
        self.dirty = true;
    }

    fn resign(&mut self) {
        if self.mode == Some(Mode::Hotseat) {
            self.game.resigned = Some(self.game.turn);
        } else {
            self.game.resigned = Some(self.color);
            self.send_offer(OfferKind::Resign);
        }
        self.dirty = true;
    }

    fn offer_draw(&mut self) {
        if self.mode == Some(Mode::Hotseat) {
            self.game.draw_offers.insert(Color::White);
            self.game.draw_offers.insert(Color::Black);
        } else {
            self.game.draw_offers.insert(self.color);
            self.send_offer(OfferKind::Draw);
        }
        self.dirty = true;
    }

    fn send_offer(&self, kind: OfferKind) {
        self.ctx.deliver(Parcel::Offer(Offer { kind, color: self.color }));
    }

    fn evaluate(&mut self) {
        if self.phase != Phase::Normal || !self.dirty {
            return;
        }
        self.dirty = false;
        if let Some(outcome) = self.game.outcome() {
            self.game_over(outcome);
        }
    }

    fn game_over(&mut self, outcome: Outcome) {
        self.game.draw_offers.clear();
        self.game.resigned = None;
        self.game.pending_promotion = None;
        self.game.last_move = None;
        self.ctx.drain_moves();
        self.phase = Phase::GameOver(outcome);
        info!("[{}] game over: {}", self.id, outcome.status());
        self.notify(outcome.to_string());
    }

    /// New game on the same transport with the same colors. A local request
    /// is announced to the opponent. Queued inbound moves are kept: the
    /// opener may already be waiting behind the request.
    fn rematch(&mut self, requested_here: bool) {
        if requested_here && self.mode != Some(Mode::Hotseat) {
            // The move slot must be empty before the opponent hears of the rematch.
            if self.mode == Some(Mode::Online) {
                self.ctx.deliver(Parcel::ClearMove);
            }
            self.send_offer(OfferKind::PlayAgain);
        }
        if let Some(mode) = self.mode {
            self.begin_game(mode, self.color);
        }
    }

    fn opponent_lost(&mut self) {
        self.notify("Opponent left");
        self.ctx.stop_worker();
        self.ctx.drain_all();
        self.ctx.forget_relay();
        self.mode = None;
        self.holds_move = None;
        self.game = GameState::new();
        self.phase = Phase::Setup;
    }

    fn teardown(&mut self) {
        info!("[{}] shutting down", self.id);
        if let Some(relay) = self.ctx.forget_relay() {
            relay.teardown();
        }
        self.ctx.stop_listener();
        self.ctx.stop_worker();
    }
}

/// Address other machines on the LAN can reach us at. Connecting a UDP
/// socket sends nothing; it only selects the outbound interface.
pub fn outward_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;

    fn hotseat() -> Session {
        let mut session = Session::new(Config::default());
        session.tick(Some(Command::Hotseat));
        session
    }

    fn mv(from: &str, to: &str) -> Command {
        Command::Move {
            from: Square::parse(from).unwrap(),
            to: Square::parse(to).unwrap(),
        }
    }

    #[test]
    fn mode_choices_lead_to_their_setup_phases() {
        let mut session = Session::new(Config::default());
        assert_eq!(session.phase(), Phase::Setup);
        session.tick(Some(Command::ChooseLocal));
        assert_eq!(session.phase(), Phase::LocalSetup(LocalStep::Choosing));

        let mut session = Session::new(Config::default());
        session.tick(Some(Command::ChooseOnline));
        assert_eq!(session.phase(), Phase::OnlineSetup(OnlineStep::Choosing));
        assert_eq!(session.mode(), Some(Mode::Online));
    }

    #[test]
    fn hotseat_alternates_sides() {
        let mut session = hotseat();
        assert_eq!(session.phase(), Phase::Normal);
        assert_eq!(session.holds_move(), None);
        session.tick(Some(mv("e2", "e4")));
        session.tick(Some(mv("e7", "e5")));
        assert_eq!(session.game().turn, Color::White);
        assert_eq!(session.game().history.len(), 3);
    }

    #[test]
    fn illegal_and_out_of_turn_moves_are_refused() {
        let mut session = hotseat();
        session.tick(Some(mv("e2", "e5")));
        session.tick(Some(mv("e7", "e5")));
        assert_eq!(session.game().turn, Color::White);
        assert_eq!(session.game().history.len(), 1);
        assert_eq!(session.take_notice().as_deref(), Some("Illegal move e2e5"));
    }

    #[test]
    fn hotseat_resign_concedes_for_the_side_to_move() {
        let mut session = hotseat();
        session.tick(Some(mv("d2", "d4")));
        session.tick(Some(Command::Resign));
        assert_eq!(
            session.phase(),
            Phase::GameOver(Outcome::Resignation { winner: Color::White })
        );
    }

    #[test]
    fn hotseat_draw_is_agreed_at_once() {
        let mut session = hotseat();
        session.tick(Some(Command::OfferDraw));
        assert_eq!(session.phase(), Phase::GameOver(Outcome::Agreement));
        session.tick(Some(Command::PlayAgain));
        assert_eq!(session.phase(), Phase::Normal);
        assert_eq!(session.game().history.len(), 1);
    }

    #[test]
    fn fools_mate_ends_the_game() {
        let mut session = hotseat();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            session.tick(Some(mv(from, to)));
        }
        assert_eq!(
            session.phase(),
            Phase::GameOver(Outcome::Checkmate { winner: Color::Black })
        );
        assert!(session.game().last_move.is_none());
        // Moves are ignored until a rematch.
        session.tick(Some(mv("a2", "a3")));
        assert!(matches!(session.phase(), Phase::GameOver(_)));
    }

    #[test]
    fn paired_session_sends_local_moves() {
        let (tx, mut sent) = mpsc::unbounded();
        let mut ctx = SessionContext::new(Config::default());
        ctx.set_outbox(tx);
        let mut session = Session::paired(Mode::Local, Color::White, ctx);
        session.tick(Some(mv("g1", "f3")));
        assert_eq!(session.holds_move(), Some(false));
        match sent.try_recv() {
            Ok(Parcel::Move(record)) => assert_eq!(record.to(), Square::parse("f3").unwrap()),
            other => panic!("expected a move parcel, got {:?}", other),
        }
    }

    #[test]
    fn legal_targets_only_for_the_side_that_may_move() {
        let session = Session::paired(Mode::Local, Color::Black, SessionContext::new(Config::default()));
        assert!(session.legal_targets(Square::parse("e7").unwrap()).is_empty());
        let session = hotseat();
        assert_eq!(session.legal_targets(Square::parse("g1").unwrap()).len(), 2);
    }
}
