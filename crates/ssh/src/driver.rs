//! NETCONF-over-SSH session driver

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use russh::client::{self, Handle, Msg};
use russh::{ChannelStream, Disconnect};
use russh_keys::key;

use ncgroups_core::{Reply, SessionDriver, TransportError};

use crate::credentials::AuthMethod;
use crate::netconf::NetconfSession;

const NETCONF_SUBSYSTEM: &str = "netconf";

/// Accepts every host key the device presents
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!("accepting host key {}", server_public_key.fingerprint());
        Ok(true)
    }
}

struct Connection {
    handle: Handle<AcceptAnyHostKey>,
    netconf: NetconfSession<ChannelStream<Msg>>,
}

/// Session driver speaking NETCONF 1.0 over an SSH `netconf` subsystem.
///
/// Each dial opens a fresh connection; close sends `<close-session/>` on a
/// best-effort basis and then disconnects.
pub struct SshDriver {
    host: String,
    port: u16,
    username: String,
    auth: AuthMethod,
    ssh_config: Arc<client::Config>,
    session: Option<Connection>,
}

impl SshDriver {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            auth,
            ssh_config: Arc::new(client::Config::default()),
            session: None,
        }
    }

    /// Drop the SSH connection after `idle` without traffic
    pub fn with_inactivity_timeout(mut self, idle: Duration) -> Self {
        self.ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(idle),
            ..Default::default()
        });
        self
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn authenticate(&self, handle: &mut Handle<AcceptAnyHostKey>) -> Result<(), TransportError> {
        let accepted = match &self.auth {
            AuthMethod::PublicKey(key) => handle
                .authenticate_publickey(self.username.as_str(), Arc::clone(key))
                .await
                .map_err(ssh_error)?,
            AuthMethod::Password(password) => handle
                .authenticate_password(self.username.as_str(), password.as_str())
                .await
                .map_err(ssh_error)?,
        };

        if accepted {
            Ok(())
        } else {
            Err(TransportError::Authentication {
                user: self.username.clone(),
            })
        }
    }

    async fn open(&self) -> Result<Connection, TransportError> {
        let mut handle = client::connect(
            Arc::clone(&self.ssh_config),
            (self.host.as_str(), self.port),
            AcceptAnyHostKey,
        )
        .await
        .map_err(|e| TransportError::Connect(format!("{}: {}", self.target(), e)))?;

        self.authenticate(&mut handle).await?;

        let channel = handle.channel_open_session().await.map_err(ssh_error)?;
        channel
            .request_subsystem(true, NETCONF_SUBSYSTEM)
            .await
            .map_err(ssh_error)?;

        let netconf = NetconfSession::start(channel.into_stream()).await?;
        Ok(Connection { handle, netconf })
    }
}

#[async_trait]
impl SessionDriver for SshDriver {
    async fn dial(&mut self) -> Result<(), TransportError> {
        if let Some(stale) = self.session.take() {
            warn!("discarding stale session to {}", self.target());
            let _ = stale
                .handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
        }

        debug!(
            "dialing {} as {} ({})",
            self.target(),
            self.username,
            self.auth.kind()
        );
        let session = self.open().await?;
        info!("NETCONF session established with {}", self.target());
        self.session = Some(session);
        Ok(())
    }

    async fn send_raw(&mut self, message: &str) -> Result<Reply, TransportError> {
        let connection = self.session.as_mut().ok_or(TransportError::NotConnected)?;
        connection.netconf.request(message).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(Connection { handle, netconf }) = self.session.take() else {
            return Ok(());
        };

        netconf.close_session().await;
        handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(ssh_error)?;

        debug!("session to {} closed", self.target());
        Ok(())
    }
}

fn ssh_error(err: russh::Error) -> TransportError {
    TransportError::Ssh(err.to_string())
}
