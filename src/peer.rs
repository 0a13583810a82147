//! A participant of a TCP ring.

use crate::{
    config::RunConfig,
    error::{Result, RingError},
    exercise::{self, Outcome},
    link::{Link, TcpLink},
    log,
    message::{Assignment, JsonLine, Registration, StartFlag},
    pause::Pause,
    topology::Participant,
};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

#[derive(Clone, Debug)]
pub struct Peer {
    pub address: String,
    pub server_address: String,
    pub config: RunConfig,
}

impl Peer {
    pub fn new(address: String, server_address: String, config: RunConfig) -> Self {
        Self {
            address,
            server_address,
            config,
        }
    }

    /// Registers with the rendezvous server and links up with both neighbors.
    pub async fn join(&self) -> Result<Link> {
        // open a server for the previous peer before anyone learns our address
        let previous_peer_listener = TcpListener::bind(&self.address).await?;
        let listen_address = previous_peer_listener.local_addr()?.to_string();

        let server_stream = TcpStream::connect(&self.server_address)
            .await
            .map_err(|source| RingError::Unreachable {
                address: self.server_address.clone(),
                source,
            })?;
        let mut server_lines = Framed::new(server_stream, LinesCodec::new());

        server_lines
            .send(Registration { listen_address }.to_json_string()?)
            .await?;

        let assignment = Assignment::from_json_string(&next_line(&mut server_lines).await?)?;
        match StartFlag::from_json_string(&next_line(&mut server_lines).await?)? {
            StartFlag(true) => {}
            StartFlag(false) => {
                return Err(RingError::UnexpectedMessage(
                    "server refused to start the ring".to_string(),
                ))
            }
        }

        let participant = Participant::initialize(assignment.size, assignment.rank)?;
        log::info(&cformat!(
            "Joined as rank <bold>{}</bold> of <bold>{}</bold>, next at <bold>{}</bold>.",
            participant.rank(),
            participant.size(),
            assignment.next_address
        ));

        TcpLink::establish(participant, previous_peer_listener, &assignment.next_address).await
    }

    pub async fn run(&self) -> Result<Outcome> {
        let mut link = self.join().await?;
        let seed = link.participant().rank() as u64;
        let mut pause = Pause::new(self.config.pause_factor, self.config.pause_mode, seed);

        exercise::run(&mut link, &self.config, &mut pause).await
    }
}

async fn next_line(lines: &mut Framed<TcpStream, LinesCodec>) -> Result<String> {
    match lines.next().await {
        Some(line) => Ok(line?),
        None => Err(RingError::UnexpectedMessage(
            "server closed the connection during bootstrap".to_string(),
        )),
    }
}
