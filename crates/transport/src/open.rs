//! URL scheme dispatch - picks a transport for an endpoint URL

use tracing::{debug, instrument};
use url::{Position, Url};

use contracts::{EndpointConfig, MetricsEndpoint, Scheme, SinkError};

use crate::endpoints::{FileEndpoint, HttpEndpoint, TcpEndpoint, UdpEndpoint};

/// Any transport selectable by URL
pub enum Endpoint {
    File(FileEndpoint),
    Udp(UdpEndpoint),
    Tcp(TcpEndpoint),
    Http(HttpEndpoint),
}

impl Endpoint {
    /// Transport kind
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::File(_) => Scheme::File,
            Self::Udp(_) => Scheme::Udp,
            Self::Tcp(_) => Scheme::Tcp,
            Self::Http(_) => Scheme::Librato,
        }
    }

    /// The HTTP endpoint, if this is one
    pub fn as_http(&self) -> Option<&HttpEndpoint> {
        match self {
            Self::Http(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Mutable access to the HTTP endpoint, if this is one
    pub fn as_http_mut(&mut self) -> Option<&mut HttpEndpoint> {
        match self {
            Self::Http(endpoint) => Some(endpoint),
            _ => None,
        }
    }
}

impl MetricsEndpoint for Endpoint {
    fn name(&self) -> &str {
        match self {
            Self::File(e) => e.name(),
            Self::Udp(e) => e.name(),
            Self::Tcp(e) => e.name(),
            Self::Http(e) => e.name(),
        }
    }

    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError> {
        match self {
            Self::File(e) => e.write(record).await,
            Self::Udp(e) => e.write(record).await,
            Self::Tcp(e) => e.write(record).await,
            Self::Http(e) => e.write(record).await,
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SinkError> {
        match self {
            Self::File(e) => e.read(buf).await,
            Self::Udp(e) => e.read(buf).await,
            Self::Tcp(e) => e.read(buf).await,
            Self::Http(e) => e.read(buf).await,
        }
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        match self {
            Self::File(e) => e.flush().await,
            Self::Udp(e) => e.flush().await,
            Self::Tcp(e) => e.flush().await,
            Self::Http(e) => e.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        match self {
            Self::File(e) => e.close().await,
            Self::Udp(e) => e.close().await,
            Self::Tcp(e) => e.close().await,
            Self::Http(e) => e.close().await,
        }
    }
}

/// Parse an endpoint URL and resolve its transport
pub fn parse_endpoint_url(raw: &str) -> Result<(Url, Scheme), SinkError> {
    let url = Url::parse(raw).map_err(|e| SinkError::invalid_url(raw, e.to_string()))?;
    let scheme = Scheme::parse(url.scheme())?;
    Ok((url, scheme))
}

/// Rewrite a `librato://` URL to `https://`, keeping host, port, path and query
///
/// `Url::set_scheme` refuses to turn a non-special scheme into a special
/// one, so the URL is rebuilt from its text after the scheme.
pub fn normalize_collector_url(url: &Url) -> Result<Url, SinkError> {
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SinkError::invalid_url(url.as_str(), "missing host"));
    }
    let rest = &url[Position::BeforeUsername..];
    Url::parse(&format!("https://{rest}"))
        .map_err(|e| SinkError::invalid_url(url.as_str(), e.to_string()))
}

/// Open the transport named by `config.url`
#[instrument(
    name = "open_endpoint",
    skip(config),
    fields(endpoint = %config.name, url = %config.url)
)]
pub async fn open(config: &EndpointConfig) -> Result<Endpoint, SinkError> {
    let (url, scheme) = parse_endpoint_url(&config.url)?;

    let endpoint = match scheme {
        Scheme::File => Endpoint::File(FileEndpoint::from_url(&config.name, &url).await?),
        Scheme::Udp => Endpoint::Udp(UdpEndpoint::from_url(&config.name, &url).await?),
        Scheme::Tcp => Endpoint::Tcp(TcpEndpoint::from_url(&config.name, &url).await?),
        Scheme::Librato => {
            let url = normalize_collector_url(&url)?;
            Endpoint::Http(HttpEndpoint::connect(url, config)?)
        }
    };

    debug!(scheme = %scheme, "Endpoint opened");
    Ok(endpoint)
}

/// Open a URL with default settings
pub async fn open_url(name: &str, url: &str) -> Result<Endpoint, SinkError> {
    open(&EndpointConfig::new(name, url)).await
}
