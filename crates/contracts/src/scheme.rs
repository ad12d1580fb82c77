//! URL scheme lookup for transport selection

use std::fmt;

use crate::SinkError;

/// Transport selected by a URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Append to a local file
    File,
    /// Connected datagram socket
    Udp,
    /// Buffered stream socket
    Tcp,
    /// Batching HTTPS collector
    Librato,
}

impl Scheme {
    /// Resolve a URL scheme.
    ///
    /// The protocol is the part before the first `+`, so `tcp+line` selects
    /// TCP. TLS and plain HTTP variants are recognized but have no transport.
    pub fn parse(scheme: &str) -> Result<Self, SinkError> {
        let scheme = scheme.to_ascii_lowercase();
        if matches!(scheme.as_str(), "tcps" | "tcp+tls") {
            return Err(SinkError::UnsupportedScheme { scheme });
        }

        let protocol = scheme.split('+').next().unwrap_or_default();
        match protocol {
            "file" => Ok(Self::File),
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "librato" => Ok(Self::Librato),
            "http" | "https" => Err(SinkError::UnsupportedScheme { scheme }),
            _ => Err(SinkError::UnknownScheme { scheme }),
        }
    }

    /// Whether responses can be read back from this transport
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, Self::Tcp | Self::Librato)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::File => "file",
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Librato => "librato",
        };
        f.write_str(name)
    }
}
