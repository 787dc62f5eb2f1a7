//! TCP listener binding for site servers.
//!
//! # Responsibilities
//! - Bind the configured address on a site group's port
//! - Derive the endpoint URL advertised for that site group

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}:{port}: {source}")]
    Bind {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `address` (IP literal or host name) on `port`.
pub async fn bind(address: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind((address, port))
        .await
        .map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            port,
            source,
        })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::debug!(address = %local_addr, "Listener bound");
    }
    Ok(listener)
}

/// Base URL clients use to reach a site bound on `address` at `local`.
///
/// Wildcard addresses are advertised as `localhost`; IPv6 literals get
/// brackets.
pub fn endpoint_url(address: &str, local: SocketAddr) -> String {
    let host = match address.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => "localhost".to_string(),
        Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
        Ok(IpAddr::V4(ip)) => ip.to_string(),
        Err(_) => address.to_string(),
    };
    format!("http://{}:{}", host, local.port())
}
