// End-to-end tests for the OSC listener and the status sender
// Real UDP sockets on the loopback interface with ephemeral ports

use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use pulsegate_osc::{
    CHATBOX_ADDRESS, Dispatcher, OscMessage, OscPacket, OscServer, OscType, StatusSender,
};
use rosc::{OscBundle, OscTime, decoder, encoder};

const WAIT: Duration = Duration::from_secs(2);

fn encode(addr: &str, args: Vec<OscType>) -> Vec<u8> {
    encoder::encode(&OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    }))
    .unwrap()
}

fn recording_server(addresses: &[&str]) -> (OscServer, mpsc::Receiver<(String, Vec<OscType>)>) {
    let (tx, rx) = mpsc::channel();
    let mut dispatcher = Dispatcher::new();
    for address in addresses {
        let tx = tx.clone();
        dispatcher
            .map(*address, move |addr, args| {
                let _ = tx.send((addr.to_string(), args.to_vec()));
            })
            .unwrap();
    }
    let server = OscServer::bind("127.0.0.1:0", Arc::new(dispatcher)).unwrap();
    (server, rx)
}

#[test]
fn test_server_dispatches_datagrams() {
    let (mut server, rx) = recording_server(&["/avatar/parameters/Left", "/dglab/switch"]);
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();

    client
        .send_to(
            &encode("/avatar/parameters/Left", vec![OscType::Float(0.4)]),
            server.local_addr(),
        )
        .unwrap();
    client
        .send_to(
            &encode("/dglab/switch", vec![OscType::Bool(false)]),
            server.local_addr(),
        )
        .unwrap();

    let first = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(first.0, "/avatar/parameters/Left");
    assert_eq!(first.1, vec![OscType::Float(0.4)]);

    let second = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(second.0, "/dglab/switch");
    assert_eq!(second.1, vec![OscType::Bool(false)]);

    assert!(server.close());
}

#[test]
fn test_server_ignores_unmapped_and_malformed() {
    let (mut server, rx) = recording_server(&["/avatar/parameters/Left"]);
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();

    client.send_to(b"garbage", server.local_addr()).unwrap();
    client
        .send_to(
            &encode("/avatar/parameters/Other", vec![OscType::Float(1.0)]),
            server.local_addr(),
        )
        .unwrap();
    client
        .send_to(
            &encode("/avatar/parameters/Left", vec![OscType::Float(0.9)]),
            server.local_addr(),
        )
        .unwrap();

    // Only the mapped message comes through; the server kept running
    let (addr, args) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(addr, "/avatar/parameters/Left");
    assert_eq!(args, vec![OscType::Float(0.9)]);
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(server.is_running());

    server.close();
}

#[test]
fn test_server_flattens_bundles() {
    let (mut server, rx) = recording_server(&["/a", "/b"]);
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();

    let bundle = OscPacket::Bundle(OscBundle {
        timetag: OscTime::from((0, 1)),
        content: vec![
            OscPacket::Message(OscMessage {
                addr: "/a".to_string(),
                args: vec![OscType::Int(1)],
            }),
            OscPacket::Message(OscMessage {
                addr: "/b".to_string(),
                args: vec![OscType::Int(2)],
            }),
        ],
    });
    client
        .send_to(&encoder::encode(&bundle).unwrap(), server.local_addr())
        .unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap().0, "/a");
    assert_eq!(rx.recv_timeout(WAIT).unwrap().0, "/b");
    server.close();
}

#[test]
fn test_close_releases_thread_promptly() {
    let (mut server, _rx) = recording_server(&[]);
    let started = std::time::Instant::now();
    assert!(server.close());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_status_sender_delivers_chatbox_messages() {
    let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let (sender, task) = StatusSender::connect(receiver.local_addr().unwrap())
        .await
        .unwrap();

    sender.send("Pulsegate ready").unwrap();
    sender.send("Output disabled").unwrap();

    let mut buffer = vec![0u8; 1024];
    let mut texts = Vec::new();
    for _ in 0..2 {
        let (len, _) = tokio::time::timeout(WAIT, receiver.recv_from(&mut buffer))
            .await
            .unwrap()
            .unwrap();
        match decoder::decode_udp(&buffer[..len]).unwrap().1 {
            OscPacket::Message(message) => {
                assert_eq!(message.addr, CHATBOX_ADDRESS);
                assert_eq!(message.args[1], OscType::Bool(true));
                texts.push(message.args[0].clone());
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    assert_eq!(
        texts,
        vec![
            OscType::String("Pulsegate ready".to_string()),
            OscType::String("Output disabled".to_string()),
        ]
    );

    // Dropping the last sender ends the delivery task
    drop(sender);
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
}
