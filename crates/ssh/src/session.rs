//! Client construction from device settings

use std::sync::Arc;

use log::info;

use ncgroups_client::{ConfigClient, TransactionClient};
use ncgroups_core::Result;

use crate::config::DeviceConfig;
use crate::credentials::select_auth;
use crate::driver::SshDriver;

/// Build a serialized transaction client for the device in `config`.
///
/// No connection is made here; each operation dials on its own.
pub fn new_serial_client(config: &DeviceConfig) -> Result<TransactionClient<SshDriver>> {
    config.validate()?;
    let auth = select_auth(config)?;

    let mut driver = SshDriver::new(config.host.as_str(), config.port, config.username.as_str(), auth);
    let timeouts = config.timeouts.to_timeouts();
    if let Some(idle) = timeouts.send {
        driver = driver.with_inactivity_timeout(idle);
    }

    info!(
        "created client for {}@{}",
        config.username,
        driver.target()
    );
    Ok(TransactionClient::new(driver).with_timeouts(timeouts))
}

/// Same as [`new_serial_client`], behind the [`ConfigClient`] capability
pub fn new_client(config: &DeviceConfig) -> Result<Arc<dyn ConfigClient>> {
    Ok(Arc::new(new_serial_client(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use ncgroups_core::ClientError;
    use std::time::Duration;

    #[test]
    fn test_builds_without_connecting() {
        let config = DeviceConfig::new("192.0.2.1", 830, "netconf")
            .with_password("secret")
            .with_timeouts(TimeoutConfig {
                dial_secs: 5,
                send_secs: 0,
                close_secs: 2,
            });

        let client = new_serial_client(&config).unwrap();
        assert_eq!(client.timeouts().dial, Some(Duration::from_secs(5)));
        assert_eq!(client.timeouts().send, None);
        assert_eq!(client.timeouts().close, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_invalid_settings() {
        let config = DeviceConfig::new("", 830, "netconf").with_password("secret");
        assert!(matches!(
            new_serial_client(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let config = DeviceConfig::new("192.0.2.1", 830, "netconf");
        assert!(matches!(new_client(&config), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_device_reports_dial() {
        let config = DeviceConfig::new("127.0.0.1", 1, "netconf")
            .with_password("secret")
            .with_timeouts(TimeoutConfig {
                dial_secs: 5,
                send_secs: 5,
                close_secs: 5,
            });

        let client = new_client(&config).unwrap();
        let err = client.commit().await.unwrap_err();
        assert_eq!(err.step(), Some(ncgroups_core::Step::Dial));
    }
}
