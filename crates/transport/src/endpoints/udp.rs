//! UdpEndpoint - one datagram per record, fire-and-forget

use std::net::SocketAddr;

use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, instrument, warn};
use url::Url;

use contracts::{MetricsEndpoint, SinkError};

/// Sink that sends each record as a single datagram
pub struct UdpEndpoint {
    name: String,
    target: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpEndpoint {
    /// Resolve `host:port` and connect a datagram socket to it
    #[instrument(name = "udp_endpoint_connect", skip(name))]
    pub async fn connect(name: impl Into<String>, addr: &str) -> Result<Self, SinkError> {
        let name = name.into();
        let target = lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| SinkError::invalid_url(addr, "host resolved to no addresses"))?;

        // Bind to any available port of the matching family
        let local = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;

        debug!(endpoint = %name, %target, "UdpEndpoint connected");
        Ok(Self {
            name,
            target,
            socket: Some(socket),
        })
    }

    /// Connect to the `host:port` of a `udp://` URL
    pub async fn from_url(name: impl Into<String>, url: &Url) -> Result<Self, SinkError> {
        Self::connect(name, &socket_addr(url)?).await
    }

    /// Resolved peer address
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn socket(&self) -> Result<&UdpSocket, SinkError> {
        self.socket
            .as_ref()
            .ok_or_else(|| SinkError::closed(self.name.as_str()))
    }
}

/// `host:port` of a socket URL; both parts are required
pub(crate) fn socket_addr(url: &Url) -> Result<String, SinkError> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| SinkError::invalid_url(url.as_str(), "missing host"))?;
    let port = url
        .port()
        .ok_or_else(|| SinkError::invalid_url(url.as_str(), "missing port"))?;
    Ok(format!("{host}:{port}"))
}

impl MetricsEndpoint for UdpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError> {
        let sent = self.socket()?.send(record).await?;
        if sent < record.len() {
            warn!(
                endpoint = %self.name,
                sent,
                len = record.len(),
                "Datagram truncated"
            );
        }
        Ok(sent)
    }

    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, SinkError> {
        Ok(0)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.socket.take().is_some() {
            debug!(endpoint = %self.name, "UdpEndpoint closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_requires_host_and_port() {
        let url = Url::parse("udp://127.0.0.1:8125").unwrap();
        assert_eq!(socket_addr(&url).unwrap(), "127.0.0.1:8125");

        let url = Url::parse("udp://127.0.0.1").unwrap();
        assert!(matches!(
            socket_addr(&url),
            Err(SinkError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_udp_endpoint_sends_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let mut endpoint = UdpEndpoint::connect("udp", &addr.to_string())
            .await
            .unwrap();
        assert_eq!(endpoint.target(), addr);
        assert_eq!(endpoint.write(b"cpu:1|g").await.unwrap(), 7);
        endpoint.write(b"mem:2|g").await.unwrap();

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"cpu:1|g");
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"mem:2|g");

        let mut out = [0u8; 8];
        assert_eq!(endpoint.read(&mut out).await.unwrap(), 0);
        endpoint.close().await.unwrap();
        assert!(endpoint.write(b"late").await.is_err());
    }
}
