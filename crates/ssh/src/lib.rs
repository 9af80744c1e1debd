//! ncgroups SSH
//!
//! NETCONF-over-SSH session driver, device settings and construction of
//! ready-to-use transaction clients.

pub mod config;
pub mod credentials;
pub mod driver;
pub mod framing;
pub mod netconf;
pub mod session;

pub use config::{ConfigError, DeviceConfig, TimeoutConfig, DEFAULT_PORT};
pub use credentials::{select_auth, AuthMethod};
pub use driver::SshDriver;
pub use netconf::NetconfSession;
pub use session::{new_client, new_serial_client};
