pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{BoardError, TransportError};
pub use session::{Command, Flow, Mode, Phase, Session, SessionContext};
