//! Module that contains all the different message types sent between participants.

use crate::{error::Result, topology::Rank};
use color_print::cformat;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Tag used to match sends and receives, as in the lab programs.
pub type Tag = u32;

pub const RING_TAG: Tag = 201;
pub const NEIGHBOR_TAG: Tag = 100;
pub const TRACE_TAG: Tag = 1;

/// Every message travels as a single JSON document on its own line.
pub trait JsonLine: Serialize + DeserializeOwned {
    /// Function that returns the message as a JSON formatted `String`.
    fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses the message from a JSON formatted `String`.
    fn from_json_string(line: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Self>(line)?)
    }
}

/// Struct that represents the counter circulated around the ring.
/// Zero is the termination sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token(pub u64);

impl Token {
    pub fn new(remaining_rounds: u64) -> Self {
        Self(remaining_rounds)
    }

    pub fn remaining_rounds(&self) -> u64 {
        self.0
    }

    pub fn is_terminal(&self) -> bool {
        self.0 == 0
    }

    /// The token one revolution later. Never goes below zero.
    pub fn decremented(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enum that represents what an exercise puts on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Token(Token),
    Value(i64),
    Trace(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "token {token}"),
            Self::Value(value) => write!(f, "value {value}"),
            Self::Trace(trace) => write!(f, "trace {trace:?}"),
        }
    }
}

/// A payload stamped with its sender and tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub payload: Payload,
}

impl JsonLine for Envelope {}

impl Envelope {
    pub fn new(source: Rank, tag: Tag, payload: Payload) -> Self {
        Self {
            source,
            tag,
            payload,
        }
    }

    pub fn token(source: Rank, token: Token) -> Self {
        Self::new(source, RING_TAG, Payload::Token(token))
    }

    pub fn describe(&self) -> String {
        cformat!(
            "<bold>{}</bold> from rank <bold>{}</bold> (tag {})",
            self.payload,
            self.source,
            self.tag
        )
    }
}

/// Struct that a peer sends to the rendezvous server once its listener is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub listen_address: String,
}

impl JsonLine for Registration {}

/// Struct that tells a peer where it sits in the ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub rank: Rank,
    pub size: usize,
    pub next_address: String,
}

impl JsonLine for Assignment {}

/// Struct that represents the message sent to ensure peers start the exercise after all peers have registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartFlag(pub bool);

impl JsonLine for StartFlag {}
