use ring_token::{
    config::{self, Command},
    log,
    peer::Peer,
    server::Server,
    world, ErrorKind, Result,
};
use std::{env, process::ExitCode};

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Local { size, run } => {
            world::run_local(size, run).await?;
        }
        Command::Server { listen, size } => {
            Server::new(listen, size)?.run().await?;
        }
        Command::Peer {
            server,
            listen,
            run,
        } => {
            Peer::new(listen, server, run).run().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let result = match config::parse_args(env::args().skip(1)) {
        Ok(command) => execute(command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error(&format!("{e}"));
            if e.kind() == ErrorKind::Configuration {
                eprintln!("{}", config::USAGE);
            }
            ExitCode::FAILURE
        }
    }
}
