//! TcpEndpoint - buffered byte stream to a peer

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, instrument};
use url::Url;

use contracts::{MetricsEndpoint, SinkError};

use super::udp::socket_addr;

/// Endpoint over a TCP stream
///
/// Writes are buffered until `flush` or `close`. Reads return bytes sent
/// back by the peer.
pub struct TcpEndpoint {
    name: String,
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: Option<BufWriter<OwnedWriteHalf>>,
}

impl TcpEndpoint {
    /// Connect to `host:port`
    #[instrument(name = "tcp_endpoint_connect", skip(name))]
    pub async fn connect(name: impl Into<String>, addr: &str) -> Result<Self, SinkError> {
        let name = name.into();
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        debug!(endpoint = %name, %peer, "TcpEndpoint connected");
        Ok(Self {
            name,
            peer,
            reader: BufReader::new(read_half),
            writer: Some(BufWriter::new(write_half)),
        })
    }

    /// Connect to the `host:port` of a `tcp://` URL
    pub async fn from_url(name: impl Into<String>, url: &Url) -> Result<Self, SinkError> {
        Self::connect(name, &socket_addr(url)?).await
    }

    /// Connected peer
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn writer(&mut self) -> Result<&mut BufWriter<OwnedWriteHalf>, SinkError> {
        self.writer
            .as_mut()
            .ok_or_else(|| SinkError::closed(self.name.as_str()))
    }
}

impl MetricsEndpoint for TcpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError> {
        self.writer()?.write_all(record).await?;
        Ok(record.len())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SinkError> {
        Ok(self.reader.read(buf).await?)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.writer()?.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.shutdown().await?;
            debug!(endpoint = %self.name, peer = %self.peer, "TcpEndpoint closed");
        }
        Ok(())
    }
}
