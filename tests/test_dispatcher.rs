use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use httptap::capture::{ReplaySource, TcpPacket};
use httptap::config::Config;
use httptap::dispatcher::Dispatcher;
use httptap::flow::ConnectionId;
use httptap::http::request::Method;
use httptap::http::{FlowEvent, HttpEvent};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

const CLIENT: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 51000);
const SERVER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 80);

fn segment(src: SocketAddrV4, dst: SocketAddrV4, seq: u32, fin: bool, payload: &[u8]) -> TcpPacket {
    TcpPacket {
        src,
        dst,
        fin,
        seq,
        payload: Bytes::copy_from_slice(payload),
    }
}

fn config(root: &Path, max_in_flight: usize) -> Config {
    Config {
        storage_root: root.to_path_buf(),
        max_in_flight,
        shed_cooldown_secs: 60,
        ..Config::default()
    }
}

fn drain_events(rx: &mut mpsc::Receiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_request_and_response_flows_are_reconstructed() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(&config(tmp.path(), 64), tx, Handle::current());

    let mut source = ReplaySource::new(vec![
        segment(CLIENT, SERVER, 1000, false, b"POST /login HTTP/1.1\r\nContent-"),
        segment(CLIENT, SERVER, 1030, false, b"Length: 4\r\n\r\nab"),
        segment(SERVER, CLIENT, 5000, false, b"HTTP/1.1 302 Found\r\n"),
        segment(CLIENT, SERVER, 1045, false, b"cdGET /home HTTP/1.1\r\n\r\n"),
        segment(SERVER, CLIENT, 5020, false, b"Content-Length: 0\r\n\r\n"),
        segment(CLIENT, SERVER, 1069, true, b""),
        segment(SERVER, CLIENT, 5041, true, b"HTTP/1.1 200 OK\r\n\r\n"),
    ]);
    dispatcher.run(&mut source).unwrap();
    dispatcher.drain().await;

    let mut by_flow: HashMap<ConnectionId, Vec<HttpEvent>> = HashMap::new();
    for FlowEvent { flow, event } in drain_events(&mut rx) {
        by_flow.entry(flow).or_default().push(event);
    }

    let requests = &by_flow[&ConnectionId::new(CLIENT, SERVER)];
    assert_eq!(requests.len(), 2);
    assert!(matches!(&requests[0], HttpEvent::Request(r) if r.method == Method::POST && r.target == "/login"));
    assert!(matches!(&requests[1], HttpEvent::Request(r) if r.target == "/home"));

    let responses = &by_flow[&ConnectionId::new(SERVER, CLIENT)];
    let codes: Vec<_> = responses
        .iter()
        .map(|e| match e {
            HttpEvent::Response(r) => r.status_code(),
            HttpEvent::Request(_) => None,
        })
        .collect();
    assert_eq!(codes, vec![Some(302), Some(200)]);

    let stats = dispatcher.stats();
    assert_eq!(stats.connections_opened, 2);
    assert_eq!(stats.connections_closed, 2);
    assert_eq!(stats.reconstructions_completed, 2);
    assert_eq!(stats.events_emitted, 4);
    assert_eq!(stats.packets_shed, 0);
    assert!(dispatcher.registry().is_empty());
}

#[tokio::test]
async fn test_fragments_removed_after_reconstruction() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(&config(tmp.path(), 64), tx, Handle::current());
    let id = ConnectionId::new(CLIENT, SERVER);

    dispatcher
        .on_packet(segment(CLIENT, SERVER, 1, false, b"GET / HTTP/1.1\r\n\r\n"))
        .unwrap()
        .await
        .unwrap();
    assert!(dispatcher.registry().contains(&id));
    assert!(dispatcher.store().flow_dir(&id).is_dir());

    dispatcher.on_packet(segment(CLIENT, SERVER, 19, true, b"")).unwrap();
    dispatcher.drain().await;

    assert!(!dispatcher.registry().contains(&id));
    assert!(!dispatcher.store().flow_dir(&id).exists());
    assert!(dispatcher.registry().is_empty());
}

#[tokio::test]
async fn test_fin_without_fragments_is_harmless() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(8);
    let mut dispatcher = Dispatcher::new(&config(tmp.path(), 8), tx, Handle::current());

    dispatcher.on_packet(segment(CLIENT, SERVER, 77, true, b"")).unwrap();
    dispatcher.drain().await;

    assert!(drain_events(&mut rx).is_empty());
    let stats = dispatcher.stats();
    assert_eq!(stats.reconstructions_completed, 1);
    assert_eq!(stats.reconstructions_failed, 0);
}

#[tokio::test]
async fn test_overload_sheds_for_cooldown() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let mut dispatcher = Dispatcher::new(&config(tmp.path(), 1), tx, Handle::current());

    // The current-thread runtime does not run the first unit until this
    // task yields, so its slot is still taken for the next two packets.
    let first = dispatcher.on_packet(segment(CLIENT, SERVER, 1, false, b"a"));
    assert!(first.is_some());
    assert_eq!(dispatcher.in_flight(), 1);

    assert!(dispatcher.on_packet(segment(CLIENT, SERVER, 2, false, b"b")).is_none());
    assert!(dispatcher.is_shedding());

    first.unwrap().await.unwrap();
    assert_eq!(dispatcher.in_flight(), 0);

    // Capacity is free again, but the cooldown has not elapsed.
    assert!(dispatcher.on_packet(segment(CLIENT, SERVER, 3, false, b"c")).is_none());

    let stats = dispatcher.stats();
    assert_eq!(stats.packets_admitted, 1);
    assert_eq!(stats.packets_shed, 2);
    assert_eq!(stats.fragments_written, 1);
}

#[tokio::test]
async fn test_shedding_ends_after_cooldown() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let cfg = Config {
        shed_cooldown_secs: 1,
        ..config(tmp.path(), 1)
    };
    let mut dispatcher = Dispatcher::new(&cfg, tx, Handle::current());

    let first = dispatcher.on_packet(segment(CLIENT, SERVER, 1, false, b"a")).unwrap();
    assert!(dispatcher.on_packet(segment(CLIENT, SERVER, 2, false, b"b")).is_none());
    first.await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let resumed = dispatcher.on_packet(segment(CLIENT, SERVER, 3, false, b"c"));
    assert!(resumed.is_some());
    assert!(!dispatcher.is_shedding());
    resumed.unwrap().await.unwrap();
}

#[tokio::test]
async fn test_storage_failure_does_not_stop_intake() {
    let tmp = tempfile::tempdir().unwrap();
    // A regular file where the storage root's directory should be.
    let root = tmp.path().join("not-a-dir");
    std::fs::write(&root, b"").unwrap();

    let (tx, _rx) = mpsc::channel(8);
    let mut dispatcher = Dispatcher::new(&config(&root, 8), tx, Handle::current());

    let mut source = ReplaySource::new(vec![
        segment(CLIENT, SERVER, 1, false, b"GET / HTTP/1.1\r\n"),
        segment(SERVER, CLIENT, 1, false, b"HTTP/1.1 200 OK\r\n"),
        segment(CLIENT, SERVER, 20, true, b""),
    ]);
    dispatcher.run(&mut source).unwrap();
    dispatcher.drain().await;

    let stats = dispatcher.stats();
    assert_eq!(stats.packets_admitted, 3);
    assert_eq!(stats.flow_create_failures, 2);
    assert_eq!(stats.fragments_written, 0);
    assert!(dispatcher.registry().is_empty());
}

#[tokio::test]
async fn test_closed_event_consumer_does_not_block_cleanup() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut dispatcher = Dispatcher::new(&config(tmp.path(), 8), tx, Handle::current());
    let id = ConnectionId::new(CLIENT, SERVER);

    let mut source = ReplaySource::new(vec![
        segment(CLIENT, SERVER, 1, false, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"),
        segment(CLIENT, SERVER, 40, true, b""),
    ]);
    dispatcher.run(&mut source).unwrap();
    dispatcher.drain().await;

    assert_eq!(dispatcher.stats().events_emitted, 2);
    assert!(!dispatcher.store().flow_dir(&id).exists());
}
