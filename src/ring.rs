//! Ring Token Protocol.
//!
//! The coordinator seeds the ring with the number of revolutions, decrements
//! the token each time it comes back, and every participant stops after
//! forwarding the zero sentinel once. The coordinator then drains the zero
//! its upstream neighbor re-delivers.

use crate::{
    error::{Result, RingError},
    link::Link,
    log,
    message::{Envelope, Payload, Token, RING_TAG},
    pause::Pause,
    topology::{Participant, Rank},
};
use color_print::cformat;

/// What one participant saw while the protocol ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingReport {
    pub rank: Rank,
    /// Values received from `prev`, drain excluded.
    pub received: Vec<u64>,
    /// Values sent to `next`, in order.
    pub sent: Vec<u64>,
    pub decrements: u64,
    /// Value of the coordinator's final drain receive.
    pub drained: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct RingToken {
    participant: Participant,
    initial_rounds: u64,
}

impl RingToken {
    pub fn initialize(ring_size: usize, rank: Rank, initial_rounds: u64) -> Result<Self> {
        Ok(Self::for_participant(
            Participant::initialize(ring_size, rank)?,
            initial_rounds,
        ))
    }

    pub fn for_participant(participant: Participant, initial_rounds: u64) -> Self {
        Self {
            participant,
            initial_rounds,
        }
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    /// The token the coordinator hands to `next` first.
    pub fn coordinator_start(&self) -> Result<Token> {
        if !self.participant.is_coordinator() {
            return Err(RingError::NotCoordinator(self.participant.rank()));
        }
        Ok(Token::new(self.initial_rounds))
    }

    /// The token to forward after receiving `token`. Only the coordinator mutates it.
    pub fn relay(&self, token: Token) -> Token {
        if self.participant.is_coordinator() {
            token.decremented()
        } else {
            token
        }
    }

    pub fn should_terminate(token: Token) -> bool {
        token.is_terminal()
    }

    /// Runs the protocol to completion for this participant.
    pub async fn run(&self, link: &mut Link, pause: &mut Pause) -> Result<RingReport> {
        let rank = self.participant.rank();
        let mut report = RingReport {
            rank,
            ..RingReport::default()
        };

        if self.participant.is_coordinator() {
            let token = self.coordinator_start()?;
            log::info(&cformat!(
                "Rank <bold>0</bold> sending <bold>{}</bold> to <bold>{}</bold>, tag {} (<bold>{}</bold> participants in ring).",
                token,
                self.participant.next(),
                RING_TAG,
                self.participant.size()
            ));
            self.send(link, token, &mut report).await?;

            if Self::should_terminate(token) {
                log::info(&cformat!("Rank <bold>0</bold> sent the sentinel first, skipping the loop."));
            } else {
                self.relay_until_sentinel(link, pause, &mut report).await?;
            }

            let drained = self.receive(link).await?;
            if !Self::should_terminate(drained) {
                return Err(RingError::UnexpectedMessage(format!(
                    "rank {rank} drained {drained} instead of the sentinel"
                )));
            }
            log::debug(&cformat!("Rank <bold>0</bold> drained <bold>{}</bold>.", drained));
            report.drained = Some(drained.remaining_rounds());
        } else {
            self.relay_until_sentinel(link, pause, &mut report).await?;
        }

        log::info(&cformat!("Rank <bold>{}</bold> exiting.", rank));
        Ok(report)
    }

    async fn relay_until_sentinel(
        &self,
        link: &mut Link,
        pause: &mut Pause,
        report: &mut RingReport,
    ) -> Result<()> {
        loop {
            let received = self.receive(link).await?;
            report.received.push(received.remaining_rounds());

            let token = self.relay(received);
            if token != received {
                report.decrements += 1;
                log::info(&cformat!(
                    "Rank <bold>{}</bold> decremented value: <bold>{}</bold>",
                    self.participant.rank(),
                    token
                ));
            }

            pause.wait().await;
            log::info(&cformat!(
                "Rank <bold>{}</bold> sending value <bold>{}</bold> to next rank <bold>{}</bold>.",
                self.participant.rank(),
                token,
                self.participant.next()
            ));
            self.send(link, token, report).await?;

            if Self::should_terminate(token) {
                return Ok(());
            }
        }
    }

    async fn send(&self, link: &mut Link, token: Token, report: &mut RingReport) -> Result<()> {
        link.send_next(Envelope::token(self.participant.rank(), token))
            .await?;
        report.sent.push(token.remaining_rounds());
        Ok(())
    }

    async fn receive(&self, link: &mut Link) -> Result<Token> {
        let envelope = link.recv_prev(RING_TAG).await?;
        match envelope.payload {
            Payload::Token(token) => Ok(token),
            other => Err(RingError::UnexpectedMessage(format!(
                "rank {} expected a token, got {other}",
                self.participant.rank()
            ))),
        }
    }
}
