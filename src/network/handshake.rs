//! Session negotiation with a JackTrip server
//!
//! A one-shot TCP rendezvous: the client connects from a generated
//! ephemeral port, sends the UDP port it intends to stream from as four
//! little-endian bytes, and receives the server's UDP port the same way.
//! The TCP socket is then discarded and a bound, connected, non-blocking
//! UDP socket takes over for the data plane.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream, UdpSocket};
use std::time::{SystemTime, UNIX_EPOCH};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::{DYNAMIC_PORT_RANGE, DYNAMIC_PORT_START};
use crate::error::NetworkError;

/// Bytes exchanged in each direction during the rendezvous
const PORT_NUMBER_BYTES: usize = 4;

/// A negotiated UDP session
#[derive(Debug)]
pub struct Session {
    /// Bound to the advertised client port, connected to the server's
    /// data port, non-blocking
    pub socket: UdpSocket,
    pub server_udp_port: u16,
}

fn clock_ticks() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Pick a port in the IANA dynamic range, perturbed by `seed` so two
/// draws in the same clock tick differ.
fn dynamic_port(seed: u16) -> u16 {
    DYNAMIC_PORT_START + (clock_ticks().wrapping_add(u64::from(seed)) % u64::from(DYNAMIC_PORT_RANGE)) as u16
}

/// Run the TCP rendezvous against `server_addr` and return the connected
/// UDP endpoint.
///
/// Any failure tears down whatever was opened and surfaces as a
/// [`NetworkError`]; the caller is expected to cool down and retry from
/// scratch.
pub fn negotiate(server_addr: SocketAddr) -> Result<Session, NetworkError> {
    let tcp_port = dynamic_port(0);
    let mut udp_port = dynamic_port(tcp_port);
    while udp_port == tcp_port {
        udp_port = dynamic_port(udp_port);
    }

    tracing::info!(%server_addr, "looking for a JackTrip server");

    // std::net cannot bind a TCP client port before connecting, so the
    // rendezvous socket is built through socket2.
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, tcp_port)).into())
        .map_err(|e| NetworkError::BindFailed(format!("port {tcp_port}: {e}")))?;
    tracing::debug!(port = tcp_port, "bound TCP rendezvous socket");

    socket
        .connect(&server_addr.into())
        .map_err(|e| NetworkError::ConnectFailed(format!("{server_addr}: {e}")))?;
    let mut tcp: TcpStream = socket.into();
    tracing::info!("TCP connection with server accepted");

    let advertised = u32::from(udp_port).to_le_bytes();
    debug_assert_eq!(advertised.len(), PORT_NUMBER_BYTES);
    tcp.write_all(&advertised)
        .map_err(|e| NetworkError::ShortWrite(e.to_string()))?;
    tracing::info!(port = udp_port, "sent UDP port number to JackTrip server");

    let mut reply = [0u8; PORT_NUMBER_BYTES];
    tcp.read_exact(&mut reply)
        .map_err(|e| NetworkError::ShortRead(e.to_string()))?;
    let server_udp_port = u32::from_le_bytes(reply) as u16;
    tracing::info!(port = server_udp_port, "received UDP port from JackTrip server");

    // The rendezvous socket is ephemeral; release it before the UDP
    // socket opens to keep peak socket count low on small stacks.
    drop(tcp);

    let udp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, udp_port))
        .map_err(|e| NetworkError::BindFailed(format!("port {udp_port}: {e}")))?;
    udp.connect((server_addr.ip(), server_udp_port))
        .map_err(|e| NetworkError::ConnectFailed(e.to_string()))?;
    udp.set_nonblocking(true)
        .map_err(|e| NetworkError::ConnectFailed(e.to_string()))?;

    tracing::info!(
        "ready to send datagrams to {}:{}",
        server_addr.ip(),
        server_udp_port
    );

    Ok(Session {
        socket: udp,
        server_udp_port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_dynamic_ports_stay_in_range() {
        for seed in [0u16, 1, 999, u16::MAX] {
            let port = dynamic_port(seed);
            assert!(port >= DYNAMIC_PORT_START);
        }
    }

    #[test]
    fn test_negotiate_happy_path() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server_addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            let client_udp_port = u32::from_le_bytes(buf) as u16;
            stream.write_all(&54321u32.to_le_bytes()).unwrap();
            client_udp_port
        });

        let session = negotiate(server_addr).unwrap();
        let client_udp_port = server.join().unwrap();

        assert_eq!(session.server_udp_port, 54321);
        assert!(client_udp_port >= DYNAMIC_PORT_START);
        assert_eq!(
            session.socket.local_addr().unwrap().port(),
            client_udp_port
        );
        assert_eq!(session.socket.peer_addr().unwrap().port(), 54321);
    }

    #[test]
    fn test_negotiate_peer_refused() {
        // Grab a port, then close it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_addr = listener.local_addr().unwrap();
        drop(listener);

        let err = negotiate(dead_addr).unwrap_err();
        assert!(matches!(err, NetworkError::ConnectFailed(_)));
    }
}
