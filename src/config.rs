//! Command-line configuration.
//!
//! Flags come first, then the two positional numbers the lab programs take:
//! `[PAUSE [ROUNDS]]`.

use crate::{
    error::{Result, RingError},
    exercise::Exercise,
    pause::PauseMode,
};

pub const DEFAULT_ROUNDS: u64 = 10;
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:0";

pub const USAGE: &str = "\
usage:
  ring-token local  --size N [--exercise E] [--pause-mode M] [PAUSE [ROUNDS]]
  ring-token server --listen ADDR --size N
  ring-token peer   --server ADDR [--listen ADDR] [--exercise E] [--pause-mode M] [PAUSE [ROUNDS]]

  E: hello | neighbor | ring | trace   (default ring)
  M: spin | sleep | poisson            (default spin)";

/// Settings every participant of a run shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub exercise: Exercise,
    pub pause_factor: u64,
    pub pause_mode: PauseMode,
    pub initial_rounds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exercise: Exercise::default(),
            pause_factor: 0,
            pause_mode: PauseMode::default(),
            initial_rounds: DEFAULT_ROUNDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// All participants as tasks of this process.
    Local { size: usize, run: RunConfig },
    /// Rendezvous server for one ring of `size` peers.
    Server { listen: String, size: usize },
    /// One participant of a TCP ring.
    Peer {
        server: String,
        listen: String,
        run: RunConfig,
    },
}

/// Parses the arguments after the program name.
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mode = args.next().ok_or(RingError::MissingArgument("command"))?;
    let (accepted, takes_positional): (&[&str], bool) = match mode.as_str() {
        "local" => (&["--size", "--exercise", "--pause-mode"][..], true),
        "server" => (&["--listen", "--size"][..], false),
        "peer" => (&["--server", "--listen", "--exercise", "--pause-mode"][..], true),
        _ => return Err(RingError::UnknownArgument(mode)),
    };

    let mut size: Option<usize> = None;
    let mut listen: Option<String> = None;
    let mut server: Option<String> = None;
    let mut run = RunConfig::default();
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        let is_flag = arg.starts_with("--");
        if (is_flag && !accepted.contains(&arg.as_str())) || (!is_flag && !takes_positional) {
            return Err(RingError::UnknownArgument(arg));
        }

        match arg.as_str() {
            "--size" => size = Some(parse_size(&value_of("size", args.next())?)?),
            "--listen" => listen = Some(value_of("listen", args.next())?),
            "--server" => server = Some(value_of("server", args.next())?),
            "--exercise" => run.exercise = value_of("exercise", args.next())?.parse()?,
            "--pause-mode" => run.pause_mode = value_of("pause-mode", args.next())?.parse()?,
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    if let Some(pause) = positional.next() {
        run.pause_factor = parse_count("pause", &pause)?;
    }
    if let Some(rounds) = positional.next() {
        run.initial_rounds = parse_count("rounds", &rounds)?;
    }
    if let Some(extra) = positional.next() {
        return Err(RingError::UnknownArgument(extra));
    }

    match mode.as_str() {
        "local" => Ok(Command::Local {
            size: size.ok_or(RingError::MissingArgument("size"))?,
            run,
        }),
        "server" => Ok(Command::Server {
            listen: listen.ok_or(RingError::MissingArgument("listen"))?,
            size: size.ok_or(RingError::MissingArgument("size"))?,
        }),
        "peer" => Ok(Command::Peer {
            server: server.ok_or(RingError::MissingArgument("server"))?,
            listen: listen.unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string()),
            run,
        }),
        _ => Err(RingError::UnknownArgument(mode)),
    }
}

fn value_of(name: &'static str, value: Option<String>) -> Result<String> {
    value.ok_or(RingError::MissingArgument(name))
}

/// Non-negative integer argument.
pub fn parse_count(name: &'static str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| RingError::InvalidArgument {
        name,
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}

fn parse_size(value: &str) -> Result<usize> {
    let size = parse_count("size", value)?;
    match usize::try_from(size) {
        Ok(0) | Err(_) => Err(RingError::InvalidRingSize(0)),
        Ok(size) => Ok(size),
    }
}
