//! The unreliable, packet-oriented network primitive.
//!
//! [`Network`] is the only thing either endpoint knows about the wire: a
//! fire-and-forget `send` and a `try_recv` that returns immediately with
//! `None` when nothing is waiting.  Packets may be dropped or reordered, but
//! are assumed not to be corrupted or spontaneously duplicated.
//!
//! [`UdpNetwork`] is the real implementation over a tokio UDP socket; the
//! in-memory [`crate::simulator`] link implements the same trait for tests.

use std::fmt;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use tokio::net::UdpSocket;

/// Largest datagram accepted by [`UdpNetwork::try_recv`].
const MAX_DATAGRAM: usize = 65_535;

/// A non-blocking, lossy packet network.
///
/// All methods are `&self` so one network can be shared between the sending
/// loop, the ack listener, and the retransmission timers.
pub trait Network: Send + Sync {
    /// Hand `packet` to the network.  Delivery is not guaranteed.
    fn send(&self, packet: &[u8]) -> io::Result<()>;

    /// Take the next waiting packet, or `None` if nothing has arrived.
    /// Never suspends.
    fn try_recv(&self) -> io::Result<Option<Vec<u8>>>;
}

/// A [`Network`] backed by a single UDP socket talking to one peer.
pub struct UdpNetwork {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
    /// `None` until the peer is known; a listening endpoint adopts the
    /// source of the first datagram it receives.
    peer: Mutex<Option<SocketAddr>>,
    /// Scratch space reused by every poll.
    recv_buf: Mutex<Vec<u8>>,
}

impl UdpNetwork {
    /// Bind to `local_addr` and wait to learn the peer from its first packet.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            inner,
            peer: Mutex::new(None),
            recv_buf: Mutex::new(vec![0u8; MAX_DATAGRAM]),
        })
    }

    /// Bind to `local_addr` and exchange packets only with `peer`.
    pub async fn connect(local_addr: SocketAddr, peer: SocketAddr) -> io::Result<Self> {
        let net = Self::bind(local_addr).await?;
        *net.peer.lock().unwrap_or_else(PoisonError::into_inner) = Some(peer);
        Ok(net)
    }

    /// The peer packets are currently sent to, if known.
    pub fn peer(&self) -> Option<SocketAddr> {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for UdpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpNetwork")
            .field("local_addr", &self.local_addr)
            .field("peer", &self.peer())
            .finish_non_exhaustive()
    }
}

impl Network for UdpNetwork {
    fn send(&self, packet: &[u8]) -> io::Result<()> {
        let Some(peer) = self.peer() else {
            return Err(io::Error::new(
                ErrorKind::NotConnected,
                "peer address not yet known",
            ));
        };
        self.inner.try_send_to(packet, peer)?;
        Ok(())
    }

    fn try_recv(&self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = self.recv_buf.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let (n, addr) = match self.inner.try_recv_from(&mut buf[..]) {
                Ok(v) => v,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e),
            };

            let mut peer = self.peer.lock().unwrap_or_else(PoisonError::into_inner);
            match *peer {
                Some(known) if known != addr => {
                    log::debug!("[net] dropping datagram from unknown peer {addr}");
                    continue;
                }
                Some(_) => {}
                None => {
                    log::info!("[net] learned peer {addr}");
                    *peer = Some(addr);
                }
            }
            return Ok(Some(buf[..n].to_vec()));
        }
    }
}
