//! Rendezvous server that bootstraps a TCP ring.
//!
//! Peers register the address they listen on. Once `ring_size` peers have
//! registered, each one is told its rank (registration order) and the address
//! of its `next` neighbor, followed by the start flag.

use crate::{
    error::{Result, RingError},
    log,
    message::{Assignment, JsonLine, Registration, StartFlag},
    topology::{Participant, Rank},
};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Barrier, RwLock},
    task::JoinSet,
};
use tokio_util::codec::{Framed, LinesCodec};

/// Listen addresses of registered peers, indexed by rank.
#[derive(Clone, Debug, Default)]
pub struct Roster(pub Vec<String>);

impl Roster {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, listen_address: String) -> Rank {
        self.0.push(listen_address);
        self.0.len() - 1
    }

    pub fn get(&self, rank: Rank) -> Option<&String> {
        self.0.get(rank)
    }
}

#[derive(Clone, Debug)]
pub struct Server {
    pub own_address: String,
    pub ring_size: usize,
}

impl Server {
    pub fn new(own_address: String, ring_size: usize) -> Result<Self> {
        if ring_size < 1 {
            return Err(RingError::InvalidRingSize(ring_size));
        }
        Ok(Self {
            own_address,
            ring_size,
        })
    }

    async fn handle(
        stream: TcpStream,
        address: SocketAddr,
        ring_size: usize,
        barrier: Arc<Barrier>,
        roster: Arc<RwLock<Roster>>,
    ) -> Result<Rank> {
        let mut lines = Framed::new(stream, LinesCodec::new());

        let registration = match lines.next().await {
            Some(line) => Registration::from_json_string(&line?)?,
            None => return Err(RingError::UnexpectedMessage(format!(
                "{address} disconnected before registering"
            ))),
        };
        let rank = roster.write().await.push(registration.listen_address);
        log::info(&cformat!("Registered <bold>{}</bold> as rank <bold>{}</bold>.", address, rank));

        // wait for all participants to join
        barrier.wait().await;

        let participant = Participant::initialize(ring_size, rank)?;
        let next_address = roster
            .read()
            .await
            .get(participant.next())
            .cloned()
            .ok_or(RingError::InvalidRank {
                rank: participant.next(),
                size: ring_size,
            })?;

        lines
            .send(
                Assignment {
                    rank,
                    size: ring_size,
                    next_address,
                }
                .to_json_string()?,
            )
            .await?;

        log::debug(&cformat!("Send <bold>starting flag</bold> to rank {}.", rank));
        lines.send(StartFlag(true).to_json_string()?).await?;

        Ok(rank)
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.own_address).await?;
        log::info(&cformat!(
            "Waiting for <bold>{}</bold> peers on <bold>{}</bold>.",
            self.ring_size,
            listener.local_addr()?
        ));
        self.serve(listener).await
    }

    /// Serves one ring on an already bound listener and returns once every peer has its assignment.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let barrier = Arc::new(Barrier::new(self.ring_size));
        let roster = Arc::new(RwLock::new(Roster::new()));

        let mut handles = JoinSet::new();
        for _ in 0..self.ring_size {
            let (peer_stream, peer_address) = listener.accept().await?;
            log::debug(&cformat!("Accepted a <bold>connection</bold> from {}.", peer_address));

            let barrier = barrier.clone();
            let roster = roster.clone();
            let ring_size = self.ring_size;

            handles.spawn(async move {
                Self::handle(peer_stream, peer_address, ring_size, barrier, roster).await
            });
        }

        // a peer failing before the barrier leaves the others parked on it
        while let Some(joined) = handles.join_next().await {
            if let Err(e) = joined? {
                log::error(&format!("{e}"));
                handles.abort_all();
                return Err(e);
            }
        }

        log::info(&cformat!("All <bold>{}</bold> peers started.", self.ring_size));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn roster_assigns_ranks_in_order() {
        let mut roster = Roster::new();
        assert_eq!(roster.push("a".into()), 0);
        assert_eq!(roster.push("b".into()), 1);
        assert_eq!(roster.get(1).map(String::as_str), Some("b"));
        assert!(roster.get(2).is_none());
    }

    #[test]
    fn rejects_empty_ring() {
        assert!(matches!(
            Server::new("127.0.0.1:0".into(), 0),
            Err(RingError::InvalidRingSize(0))
        ));
    }

    #[tokio::test]
    async fn assigns_next_addresses() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = Server::new(address.to_string(), 2).unwrap();
        let serving = tokio::spawn(async move { server.serve(listener).await });

        let mut assignments = Vec::new();
        for listen_address in ["first", "second"] {
            let stream = TcpStream::connect(address).await.unwrap();
            let mut lines = Framed::new(stream, LinesCodec::new());
            lines
                .send(
                    Registration {
                        listen_address: listen_address.into(),
                    }
                    .to_json_string()
                    .unwrap(),
                )
                .await
                .unwrap();
            assignments.push((listen_address, lines));
        }

        let mut received = Vec::new();
        for (listen_address, lines) in assignments.iter_mut() {
            let assignment =
                Assignment::from_json_string(&lines.next().await.unwrap().unwrap()).unwrap();
            let start = StartFlag::from_json_string(&lines.next().await.unwrap().unwrap()).unwrap();
            assert_eq!(start, StartFlag(true));
            received.push((*listen_address, assignment));
        }
        serving.await.unwrap().unwrap();

        // ranks follow registration order, which the two clients race for
        let mut ranks: Vec<_> = received.iter().map(|(_, a)| a.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![0, 1]);
        for (listen_address, assignment) in &received {
            assert_eq!(assignment.size, 2);
            let other = if *listen_address == "first" { "second" } else { "first" };
            assert_eq!(assignment.next_address, other);
        }
    }

    #[tokio::test]
    async fn malformed_registration_fails_the_ring() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = Server::new(address.to_string(), 2).unwrap();
        let serving = tokio::spawn(async move { server.serve(listener).await });

        let mut registered = Framed::new(TcpStream::connect(address).await.unwrap(), LinesCodec::new());
        registered
            .send(
                Registration {
                    listen_address: "127.0.0.1:9".into(),
                }
                .to_json_string()
                .unwrap(),
            )
            .await
            .unwrap();

        let mut garbage = Framed::new(TcpStream::connect(address).await.unwrap(), LinesCodec::new());
        garbage.send("garbage".to_string()).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(3), serving)
            .await
            .expect("server stayed parked on the barrier")
            .unwrap();
        assert!(matches!(result, Err(RingError::Json(_))));

        // the peer that registered is cut off instead of waiting for an assignment
        assert!(matches!(registered.next().await, None | Some(Err(_))));
    }
}
