use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const BIND_ADDR: &str = "VIGIL_BIND_ADDR";

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

pub fn get_default_bind_addr() -> SocketAddr {
    DEFAULT_BIND_ADDR
}

/// Bind address override from the environment, if set and valid
pub fn get_bind_addr() -> Option<SocketAddr> {
    std::env::var(BIND_ADDR).ok().and_then(|res| res.parse().ok())
}

const DATA_DIR: &str = "VIGIL_DATA_DIR";

/// Data directory override from the environment
pub fn get_data_dir() -> Option<PathBuf> {
    std::env::var(DATA_DIR).ok().map(PathBuf::from)
}
