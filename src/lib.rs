//! Message-passing lab exercises over a logical ring of participants:
//! hello world, neighbor send/receive, a trace ring, and the token ring that
//! circulates a decrementing counter until the zero sentinel.

pub mod config;
pub mod error;
pub mod exercise;
pub mod link;
pub mod log;
pub mod message;
pub mod pause;
pub mod peer;
pub mod ring;
pub mod server;
pub mod topology;
pub mod world;

pub use config::{Command, RunConfig};
pub use error::{ErrorKind, Result, RingError};
pub use exercise::{Exercise, Outcome};
pub use ring::{RingReport, RingToken};
pub use topology::{Participant, Rank};
