//! Runs every participant as a task of this process.

use crate::{
    config::RunConfig,
    error::Result,
    exercise::{self, Outcome},
    link::{local_ring, Link},
    log,
    pause::Pause,
};
use color_print::cformat;
use std::future::Future;
use tokio::task::JoinSet;

/// Spawns `size` participants over local links and returns their outcomes by rank.
pub async fn run_local(size: usize, config: RunConfig) -> Result<Vec<Outcome>> {
    let links = local_ring(size)?;
    log::info(&cformat!(
        "Starting <bold>{:?}</bold> with <bold>{}</bold> local participants.",
        config.exercise,
        size
    ));

    run_participants(links, move |mut link| async move {
        let seed = link.participant().rank() as u64;
        let mut pause = Pause::new(config.pause_factor, config.pause_mode, seed);
        exercise::run(&mut link, &config, &mut pause).await
    })
    .await
}

/// Runs `participant` once per link. The first participant to fail decides the
/// error; the rest are aborted, since their own failures only echo it around the ring.
async fn run_participants<F, Fut>(links: Vec<Link>, participant: F) -> Result<Vec<Outcome>>
where
    F: Fn(Link) -> Fut,
    Fut: Future<Output = Result<Outcome>> + Send + 'static,
{
    let size = links.len();
    let mut tasks = JoinSet::new();
    for link in links {
        let rank = link.participant().rank();
        let run = participant(link);
        tasks.spawn(async move { (rank, run.await) });
    }

    let mut outcomes: Vec<Option<Outcome>> = (0..size).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (rank, result) = joined?;
        match result {
            Ok(outcome) => outcomes[rank] = Some(outcome),
            Err(e) => {
                log::error(&cformat!("Rank <bold>{}</bold> failed: {}", rank, e));
                tasks.abort_all();
                return Err(e);
            }
        }
    }
    Ok(outcomes.into_iter().flatten().collect())
}
