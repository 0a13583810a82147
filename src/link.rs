//! A participant's two channels: outbound to `next`, inbound from `prev`.
//!
//! Both variants deliver in FIFO order per edge and never block on send
//! (unbounded queues locally, kernel buffers over TCP), which is what lets a
//! ring of one send to itself.

use crate::{
    error::{Result, RingError},
    log,
    message::{Envelope, JsonLine, Tag},
    topology::{self, Participant},
};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_util::codec::{Framed, LinesCodec};

pub enum Link {
    Local(LocalLink),
    Tcp(TcpLink),
}

impl Link {
    pub fn participant(&self) -> &Participant {
        match self {
            Self::Local(link) => &link.participant,
            Self::Tcp(link) => &link.participant,
        }
    }

    pub async fn send_next(&mut self, envelope: Envelope) -> Result<()> {
        let next = self.participant().next();
        log::debug(&cformat!("Sending {} to rank <bold>{}</bold>.", envelope.describe(), next));

        match self {
            Self::Local(link) => link
                .outbound
                .send(envelope)
                .map_err(|_| RingError::ChannelClosed(next)),
            Self::Tcp(link) => {
                link.next_lines.send(envelope.to_json_string()?).await?;
                Ok(())
            }
        }
    }

    /// Receives the next envelope from `prev`, which must carry `tag`.
    pub async fn recv_prev(&mut self, tag: Tag) -> Result<Envelope> {
        let prev = self.participant().prev();

        let envelope = match self {
            Self::Local(link) => link
                .inbound
                .recv()
                .await
                .ok_or(RingError::ChannelClosed(prev))?,
            Self::Tcp(link) => match link.prev_lines.next().await {
                Some(line) => Envelope::from_json_string(&line?)?,
                None => return Err(RingError::ChannelClosed(prev)),
            },
        };

        if envelope.source != prev || envelope.tag != tag {
            return Err(RingError::UnexpectedMessage(format!(
                "expected tag {tag} from rank {prev}, got {}",
                envelope.describe()
            )));
        }
        log::debug(&cformat!("Received {}.", envelope.describe()));

        Ok(envelope)
    }
}

pub struct LocalLink {
    participant: Participant,
    outbound: UnboundedSender<Envelope>,
    inbound: UnboundedReceiver<Envelope>,
}

/// Builds one link per rank. Channel `r` carries everything addressed to rank `r`.
pub fn local_ring(size: usize) -> Result<Vec<Link>> {
    let participants = topology::ring(size)?;
    let (senders, receivers): (Vec<_>, Vec<_>) =
        (0..size).map(|_| mpsc::unbounded_channel()).unzip();

    let mut links = Vec::with_capacity(size);
    for (participant, inbound) in participants.into_iter().zip(receivers) {
        links.push(Link::Local(LocalLink {
            outbound: senders[participant.next()].clone(),
            participant,
            inbound,
        }));
    }
    Ok(links)
}

pub struct TcpLink {
    participant: Participant,
    next_lines: Framed<TcpStream, LinesCodec>,
    prev_lines: Framed<TcpStream, LinesCodec>,
}

impl TcpLink {
    /// Connects to `next` and then accepts the connection from `prev` on `listener`.
    ///
    /// The listener must already be bound, otherwise two peers connecting to each
    /// other would wait forever.
    pub async fn establish(
        participant: Participant,
        listener: TcpListener,
        next_address: &str,
    ) -> Result<Link> {
        let next_stream =
            TcpStream::connect(next_address)
                .await
                .map_err(|source| RingError::Unreachable {
                    address: next_address.to_string(),
                    source,
                })?;
        next_stream.set_nodelay(true)?;

        let (prev_stream, prev_address) = listener.accept().await?;
        prev_stream.set_nodelay(true)?;

        log::debug(&cformat!(
            "Rank <bold>{}</bold> linked: next at <bold>{}</bold>, prev from <bold>{}</bold>.",
            participant.rank(),
            next_address,
            prev_address
        ));

        Ok(Link::Tcp(Self {
            participant,
            next_lines: Framed::new(next_stream, LinesCodec::new()),
            prev_lines: Framed::new(prev_stream, LinesCodec::new()),
        }))
    }
}
