//! Endpoint implementations
//!
//! Contains FileEndpoint, UdpEndpoint, TcpEndpoint, and HttpEndpoint.

mod file;
mod http;
mod tcp;
mod udp;

pub use self::file::FileEndpoint;
pub use self::http::{HttpEndpoint, RecordWriter};
pub use self::tcp::TcpEndpoint;
pub use self::udp::UdpEndpoint;
