use std::net::{Ipv4Addr, SocketAddrV4};

use bytes::Bytes;
use httptap::flow::ConnectionId;
use httptap::http::request::{Method, RequestStart};
use httptap::http::response::ResponseStart;
use httptap::http::{HttpEvent, HttpSegmenter, SegmenterState};
use httptap::store::{FragmentStore, SequenceToken};
use httptap::stream::{MemoryStream, StreamMaterializer};

fn get(target: &str) -> HttpEvent {
    HttpEvent::Request(RequestStart::new(Method::GET, target, "HTTP/1.1"))
}

#[tokio::test]
async fn test_request_body_skipped_between_requests() {
    let input = b"GET /index HTTP/1.1\r\nContent-Length: 5\r\n\r\nHELLOGET /next HTTP/1.1\r\n\r\n";
    let events = HttpSegmenter::new(MemoryStream::new(&input[..])).collect().await.unwrap();

    assert_eq!(events, vec![get("/index"), get("/next")]);
}

#[tokio::test]
async fn test_single_response() {
    let input = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
    let events = HttpSegmenter::new(MemoryStream::new(&input[..])).collect().await.unwrap();

    assert_eq!(
        events,
        vec![HttpEvent::Response(ResponseStart::new("HTTP/1.1", "200 OK"))]
    );
}

#[tokio::test]
async fn test_crlf_split_exactly_between_reads() {
    let chunks = [&b"GET /split HTTP/1.1\r"[..], &b"\nHost: a\r\n\r\n"[..]];
    let mut segmenter = HttpSegmenter::new(MemoryStream::from_chunks(chunks));

    assert_eq!(segmenter.next_event().await.unwrap(), Some(get("/split")));
    assert_eq!(segmenter.state(), SegmenterState::InMessage { body_len: 0 });
    assert_eq!(segmenter.next_event().await.unwrap(), None);
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[tokio::test]
async fn test_every_byte_in_its_own_read() {
    let input = b"GET /index HTTP/1.1\r\nContent-Length: 5\r\n\r\nHELLOGET /next HTTP/1.1\r\n\r\n";
    let chunks: Vec<Bytes> = input.iter().map(|b| Bytes::copy_from_slice(&[*b])).collect();
    let events = HttpSegmenter::new(MemoryStream::from_chunks(chunks)).collect().await.unwrap();

    assert_eq!(events, vec![get("/index"), get("/next")]);
}

#[tokio::test]
async fn test_request_and_response_exchange() {
    let input = concat!(
        "POST /api HTTP/1.1\r\n",
        "Host: localhost\r\n",
        "Content-Length: 10\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"a\":\"\r\n\"}",
        "HTTP/1.1 201 Created\r\n",
        "\r\n",
        "DELETE /api/1 HTTP/1.1\r\n",
        "\r\n",
    );
    let events = HttpSegmenter::new(MemoryStream::new(input)).collect().await.unwrap();

    assert_eq!(
        events,
        vec![
            HttpEvent::Request(RequestStart::new(Method::POST, "/api", "HTTP/1.1")),
            HttpEvent::Response(ResponseStart::new("HTTP/1.1", "201 Created")),
            HttpEvent::Request(RequestStart::new(Method::DELETE, "/api/1", "HTTP/1.1")),
        ]
    );
}

#[tokio::test]
async fn test_declared_body_longer_than_stream() {
    let input = b"HTTP/1.1 200 OK\r\nContent-Length: 9999\r\n\r\npartial";
    let events = HttpSegmenter::new(MemoryStream::new(&input[..])).collect().await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_segmenting_stored_fragments() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FragmentStore::new(tmp.path());
    let id = ConnectionId::new(
        SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 10), 49152),
        SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 80), 80),
    );
    store.create(&id).await.unwrap();

    // Boundaries fall inside the CRLF, the header name and the body.
    let parts: [&[u8]; 5] = [
        b"GET /index HTTP/1.1\r",
        b"\nContent-Le",
        b"ngth: 5\r\n\r\nHE",
        b"LLOGET /next HTTP/1.1\r\n",
        b"\r\n",
    ];
    for (i, part) in parts.iter().enumerate() {
        let token = SequenceToken(7 + i as u32 * 1460);
        store.append(&id, token, &Bytes::copy_from_slice(part)).await.unwrap();
    }

    let stream = StreamMaterializer::open(&store, &id).await.unwrap();
    let events = HttpSegmenter::new(stream).collect().await.unwrap();
    assert_eq!(events, vec![get("/index"), get("/next")]);
}
