use std::io::{self, BufRead};
use std::thread;

use chess_link::game::{PieceKind, Square};
use chess_link::session::Phase;
use chess_link::{Command, Config, Flow, Session};
use futures::channel::mpsc::{self, TryRecvError, UnboundedSender};
use log::{debug, info};

const HELP: &str = "\
commands:
  local | online | hotseat      pick a mode
  host | join <ip>              local network pairing
  create | room <code>          relay room pairing
  e2e4                          move
  q | r | b | n                 promotion choice
  moves e2                      legal targets of a piece
  resign | draw | again         offers and rematch
  board | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Targets(Square),
    Board,
    Help,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or("").to_ascii_lowercase();
    let arg = words.next();

    let command = match (head.as_str(), arg) {
        ("", _) => return Err(String::new()),
        ("help", _) => return Ok(Input::Help),
        ("board", _) => return Ok(Input::Board),
        ("moves", Some(square)) => {
            return Square::parse(square)
                .map(Input::Targets)
                .ok_or_else(|| format!("not a square: {}", square));
        }
        ("local", _) => Command::ChooseLocal,
        ("online", _) => Command::ChooseOnline,
        ("hotseat", _) => Command::Hotseat,
        ("host", _) => Command::Host,
        ("join", Some(ip)) => Command::JoinHost(ip.parse().map_err(|_| format!("not an IP address: {}", ip))?),
        ("create", _) => Command::CreateRoom,
        ("room", Some(code)) => Command::JoinRoom(code.to_string()),
        ("q", _) => Command::Promote(PieceKind::Queen),
        ("r", _) => Command::Promote(PieceKind::Rook),
        ("b", _) => Command::Promote(PieceKind::Bishop),
        ("n", _) => Command::Promote(PieceKind::Knight),
        ("resign", _) => Command::Resign,
        ("draw", _) => Command::OfferDraw,
        ("again", _) => Command::PlayAgain,
        ("quit" | "exit", _) => Command::Quit,
        (word, None) if word.len() == 4 && word.is_ascii() => {
            match (Square::parse(&word[..2]), Square::parse(&word[2..])) {
                (Some(from), Some(to)) => Command::Move { from, to },
                _ => return Err(format!("not a move: {}", word)),
            }
        }
        (word, _) => return Err(format!("unknown command: {} (try help)", word)),
    };
    Ok(Input::Command(command))
}

fn show_board(session: &Session) {
    let game = session.game();
    println!("\n{}", game.board.render());
    match session.phase() {
        Phase::Normal | Phase::PromotionPending => println!("{} to move", game.turn.name()),
        Phase::GameOver(outcome) => println!("{} (type again for a rematch)", outcome),
        _ => {}
    }
}

/// Push each input line onto `tx` until the input ends, fails, or the
/// receiver is gone. Dropping `tx` tells the main loop input is closed.
fn forward_lines<R: BufRead>(input: R, tx: UnboundedSender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if tx.unbounded_send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let tick = config.tick();
    let mut session = Session::new(config);

    let (tx, mut lines) = mpsc::unbounded::<String>();
    thread::spawn(move || forward_lines(io::stdin().lock(), tx));

    println!("{}", HELP);
    let mut shown = (session.phase(), session.game().history.len());

    loop {
        let command = match lines.try_recv() {
            Ok(line) => match parse_input(&line) {
                Ok(Input::Command(command)) => Some(command),
                Ok(Input::Targets(square)) => {
                    let targets: Vec<String> = session.legal_targets(square).iter().map(Square::to_string).collect();
                    println!("{}: {}", square, targets.join(" "));
                    None
                }
                Ok(Input::Board) => {
                    show_board(&session);
                    None
                }
                Ok(Input::Help) => {
                    println!("{}", HELP);
                    None
                }
                Err(message) => {
                    if !message.is_empty() {
                        println!("{}", message);
                    }
                    None
                }
            },
            // stdin closed
            Err(TryRecvError::Closed) => Some(Command::Quit),
            Err(TryRecvError::Empty) => None,
        };

        if let Some(command) = &command {
            debug!("command {:?}", command);
        }
        if session.tick(command) == Flow::Quit {
            break;
        }

        while let Some(notice) = session.take_notice() {
            println!("{}", notice);
        }
        let now = (session.phase(), session.game().history.len());
        if now != shown {
            shown = now;
            if matches!(now.0, Phase::Normal | Phase::PromotionPending | Phase::GameOver(_)) {
                show_board(&session);
            }
        }

        thread::sleep(tick);
    }
    info!("bye");
}
