//! The lab exercises a participant can run, all over the same ring link.

use crate::{
    config::RunConfig,
    error::{Result, RingError},
    link::Link,
    log,
    message::{Envelope, Payload, NEIGHBOR_TAG, TRACE_TAG},
    pause::Pause,
    ring::{RingReport, RingToken},
    topology::{Participant, Rank},
};
use color_print::cformat;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exercise {
    Hello,
    Neighbor,
    #[default]
    Ring,
    Trace,
}

impl FromStr for Exercise {
    type Err = RingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hello" => Ok(Self::Hello),
            "neighbor" => Ok(Self::Neighbor),
            "ring" => Ok(Self::Ring),
            "trace" => Ok(Self::Trace),
            _ => Err(RingError::InvalidArgument {
                name: "exercise",
                value: s.to_string(),
                reason: "expected one of hello, neighbor, ring, trace",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborOutcome {
    Sent { to: Rank, value: i64 },
    Received { from: Rank, value: i64 },
    /// Even rank at the end of an odd-sized group.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Hello { rank: Rank, size: usize },
    Neighbor(NeighborOutcome),
    Ring(RingReport),
    Trace(String),
}

/// Runs `config.exercise` for the participant owning `link`.
pub async fn run(link: &mut Link, config: &RunConfig, pause: &mut Pause) -> Result<Outcome> {
    let participant = *link.participant();

    match config.exercise {
        Exercise::Hello => Ok(hello(&participant)),
        Exercise::Neighbor => Ok(Outcome::Neighbor(neighbor_exchange(link).await?)),
        Exercise::Ring => {
            let protocol = RingToken::for_participant(participant, config.initial_rounds);
            Ok(Outcome::Ring(protocol.run(link, pause).await?))
        }
        Exercise::Trace => Ok(Outcome::Trace(trace_ring(link).await?)),
    }
}

pub fn hello(participant: &Participant) -> Outcome {
    log::info(&cformat!(
        "Hello, world from <bold>{}</bold> of <bold>{}</bold>!",
        participant.rank(),
        participant.size()
    ));
    Outcome::Hello {
        rank: participant.rank(),
        size: participant.size(),
    }
}

/// Even ranks send `rank * 100` to `rank + 1`, odd ranks receive it.
pub async fn neighbor_exchange(link: &mut Link) -> Result<NeighborOutcome> {
    let participant = *link.participant();
    let rank = participant.rank();

    if rank % 2 == 0 {
        if rank + 1 >= participant.size() {
            log::warn(&cformat!("Rank <bold>{}</bold> (even) has no partner to send to.", rank));
            return Ok(NeighborOutcome::Idle);
        }

        let value = rank as i64 * 100;
        log::info(&cformat!(
            "Rank <bold>{}</bold> sending message <bold>{}</bold> to rank <bold>{}</bold>.",
            rank,
            value,
            participant.next()
        ));
        link.send_next(Envelope::new(rank, NEIGHBOR_TAG, Payload::Value(value)))
            .await?;

        Ok(NeighborOutcome::Sent {
            to: participant.next(),
            value,
        })
    } else {
        log::info(&cformat!(
            "Rank <bold>{}</bold> waiting to receive from rank <bold>{}</bold>.",
            rank,
            participant.prev()
        ));
        let envelope = link.recv_prev(NEIGHBOR_TAG).await?;
        let Payload::Value(value) = envelope.payload else {
            return Err(RingError::UnexpectedMessage(format!(
                "rank {rank} expected a value, got {}",
                envelope.payload
            )));
        };
        log::info(&cformat!(
            "Rank <bold>{}</bold> received message <bold>{}</bold> from rank <bold>{}</bold>.",
            rank,
            value,
            envelope.source
        ));

        Ok(NeighborOutcome::Received {
            from: envelope.source,
            value,
        })
    }
}

/// Rank 0 starts a greeting, every other rank appends itself and forwards it.
/// Rank 0 returns the trace it gets back, the others what they forwarded.
pub async fn trace_ring(link: &mut Link) -> Result<String> {
    let rank = link.participant().rank();

    if link.participant().is_coordinator() {
        log::info(&cformat!("Rank <bold>{}</bold> starting ring.", rank));
        link.send_next(Envelope::new(
            rank,
            TRACE_TAG,
            Payload::Trace(format!("Hello from rank {rank}")),
        ))
        .await?;

        let trace = receive_trace(link).await?;
        log::info(&cformat!("Rank <bold>{}</bold> received back: {}", rank, trace));
        Ok(trace)
    } else {
        let trace = format!("{} -> rank {rank}", receive_trace(link).await?);
        link.send_next(Envelope::new(rank, TRACE_TAG, Payload::Trace(trace.clone())))
            .await?;
        log::info(&cformat!("Rank <bold>{}</bold> forwarded: {}", rank, trace));
        Ok(trace)
    }
}

async fn receive_trace(link: &mut Link) -> Result<String> {
    let envelope = link.recv_prev(TRACE_TAG).await?;
    match envelope.payload {
        Payload::Trace(trace) => Ok(trace),
        other => Err(RingError::UnexpectedMessage(format!(
            "rank {} expected a trace, got {other}",
            link.participant().rank()
        ))),
    }
}
