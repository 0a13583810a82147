use ring_token::{
    exercise::{Exercise, Outcome},
    peer::Peer,
    server::Server,
    RunConfig,
};
use std::time::Duration;
use tokio::{net::TcpListener, task::JoinHandle};

async fn start_server(size: usize) -> (String, JoinHandle<ring_token::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephem");
    let address = listener.local_addr().expect("local addr").to_string();
    let server = Server::new(address.clone(), size).expect("server");
    let handle = tokio::spawn(async move { server.serve(listener).await });
    (address, handle)
}

async fn run_peers(size: usize, config: RunConfig) -> Vec<Outcome> {
    let (server_address, server) = start_server(size).await;

    let handles: Vec<_> = (0..size)
        .map(|_| {
            let peer = Peer::new("127.0.0.1:0".to_string(), server_address.clone(), config);
            tokio::spawn(async move { peer.run().await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        let outcome = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("peer blocked forever")
            .expect("peer task")
            .expect("peer run");
        outcomes.push(outcome);
    }
    server.await.expect("server task").expect("server run");
    outcomes
}

fn ring_reports(outcomes: Vec<Outcome>) -> Vec<ring_token::RingReport> {
    let mut reports: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Outcome::Ring(report) => report,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    // peers get their rank from registration order, not spawn order
    reports.sort_by_key(|report| report.rank);
    reports
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn token_circulates_over_tcp() {
    let config = RunConfig {
        exercise: Exercise::Ring,
        initial_rounds: 2,
        ..RunConfig::default()
    };
    let reports = ring_reports(run_peers(3, config).await);

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].sent, vec![2, 1, 0]);
    assert_eq!(reports[0].decrements, 2);
    assert_eq!(reports[0].drained, Some(0));
    for report in &reports[1..] {
        assert_eq!(report.received, vec![2, 1, 0]);
        assert_eq!(report.sent, report.received);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_peer_ring_does_not_deadlock() {
    let config = RunConfig {
        exercise: Exercise::Ring,
        initial_rounds: 0,
        ..RunConfig::default()
    };
    let reports = ring_reports(run_peers(1, config).await);

    assert_eq!(reports[0].sent, vec![0]);
    assert_eq!(reports[0].drained, Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn trace_over_tcp() {
    let config = RunConfig {
        exercise: Exercise::Trace,
        ..RunConfig::default()
    };
    let outcomes = run_peers(3, config).await;

    assert!(outcomes.contains(&Outcome::Trace(
        "Hello from rank 0 -> rank 1 -> rank 2".to_string()
    )));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephem");
    let address = listener.local_addr().expect("local addr").to_string();
    drop(listener);

    let peer = Peer::new("127.0.0.1:0".to_string(), address, RunConfig::default());
    let err = peer.run().await.expect_err("nobody is listening");
    assert_eq!(err.kind(), ring_token::ErrorKind::Transport);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_registration_stops_waiting_peers() {
    use futures::SinkExt;
    use tokio_util::codec::{Framed, LinesCodec};

    let (server_address, server) = start_server(2).await;

    let peer = Peer::new("127.0.0.1:0".to_string(), server_address.clone(), RunConfig::default());
    let joining = tokio::spawn(async move { peer.run().await });

    let stream = tokio::net::TcpStream::connect(&server_address)
        .await
        .expect("connect");
    let mut garbage = Framed::new(stream, LinesCodec::new());
    garbage.send("garbage".to_string()).await.expect("send");

    let served = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server hung on the barrier")
        .expect("server task");
    assert!(served.is_err());

    let err = tokio::time::timeout(Duration::from_secs(5), joining)
        .await
        .expect("peer kept waiting for its assignment")
        .expect("peer task")
        .expect_err("bootstrap was aborted");
    assert_eq!(err.kind(), ring_token::ErrorKind::Transport);
}
