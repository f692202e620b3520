use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use glint_protocol::handshake::HandshakePacket;
use glint_protocol::{FrameCodec, PacketBody, PacketBuffer, PROTOCOL_VERSION};
use glint_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

pub type Client = Framed<TcpStream, FrameCodec>;

/// Starts a server on an ephemeral port and returns its address.
pub async fn start_server(config: ServerConfig) -> SocketAddr {
    let server = Server::bind(ServerConfig {
        bind: "127.0.0.1:0".to_owned(),
        ..config
    })
    .await
    .unwrap();
    let address = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    address
}

pub async fn connect_to_server(address: SocketAddr) -> Client {
    let socket = TcpStream::connect(address).await.unwrap();
    Framed::new(socket, FrameCodec::new())
}

/// Sends a serverbound packet with the given id.
pub async fn send_packet<P: PacketBody>(client: &mut Client, id: i32, packet: &P) {
    let mut buffer = PacketBuffer::new();
    buffer.write_varint(id);
    packet.write_body(&mut buffer).unwrap();
    client.send(Bytes::from(buffer.into_inner())).await.unwrap();
}

pub async fn send_handshake(client: &mut Client, protocol_version: i32, next_state: i32) {
    let handshake = HandshakePacket::new(protocol_version, "localhost", 25565, next_state);
    send_packet(client, 0x00, &handshake).await;
}

/// Sends a current-version handshake with a custom hostname field.
pub async fn send_handshake_to(client: &mut Client, hostname: &str, next_state: i32) {
    let handshake = HandshakePacket::new(PROTOCOL_VERSION, hostname, 25565, next_state);
    send_packet(client, 0x00, &handshake).await;
}

pub async fn send_current_handshake(client: &mut Client, next_state: i32) {
    send_handshake(client, PROTOCOL_VERSION, next_state).await;
}

/// Reads the next frame and splits off its packet id.
pub async fn read_packet(client: &mut Client) -> (i32, PacketBuffer) {
    let frame = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a packet")
        .expect("connection closed")
        .unwrap();
    let mut buffer = PacketBuffer::from_bytes(frame.to_vec());
    let id = buffer.read_varint().unwrap();
    (id, buffer)
}

/// True once the server has closed the connection.
pub async fn is_closed(client: &mut Client) -> bool {
    matches!(
        timeout(Duration::from_secs(5), client.next()).await,
        Ok(None) | Ok(Some(Err(_)))
    )
}

pub fn assert_response_contains_status_fields(response: &str) {
    let status: serde_json::Value = serde_json::from_str(response).unwrap();
    assert!(status.get("version").is_some(), "Response missing version field");
    assert!(status.get("players").is_some(), "Response missing players field");
    assert!(
        status.get("description").is_some(),
        "Response missing description field"
    );
}
