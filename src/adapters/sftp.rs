use crate::config::toml_config::IngestConfig;
use crate::domain::ports::RemoteSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_required_field;
use ssh2::{ErrorCode, Session};
use std::fs::File;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// libssh2 的 LIBSSH2_FX_NO_SUCH_FILE
const SFTP_NO_SUCH_FILE: i32 = 2;

/// 以帳號密碼登入 SFTP 伺服器下載檔案
#[derive(Clone)]
pub struct SftpSource {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl std::fmt::Debug for SftpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpSource")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SftpSource {
    pub fn new(host: String, port: u16, username: String, password: String, timeout: Duration) -> Self {
        Self {
            host,
            port,
            username,
            password,
            timeout,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let host = validate_required_field("source.host", &config.source.host)?;
        let username = validate_required_field("source.username", &config.source.username)?;
        let password = validate_required_field("source.password", &config.source.password)?;
        Ok(Self::new(
            host.clone(),
            config.port(),
            username.clone(),
            password.clone(),
            config.timeout(),
        ))
    }

    fn connect(&self) -> Result<Session> {
        let address = (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                EtlError::IoError(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Cannot resolve host {}", self.host),
                ))
            })?;

        let tcp = TcpStream::connect_timeout(&address, self.timeout)?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(self.timeout.as_millis().min(u32::MAX as u128) as u32);
        session.handshake()?;
        // 只用密碼登入，不走 agent 也不找本機金鑰
        session.userauth_password(&self.username, &self.password)?;

        if !session.authenticated() {
            return Err(EtlError::ConfigError {
                message: format!("SFTP authentication failed for user {}", self.username),
            });
        }
        tracing::info!("🔐 Connected to SFTP server {}:{}", self.host, self.port);
        Ok(session)
    }

    fn download_blocking(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let session = self.connect()?;
        let sftp = session.sftp()?;

        let mut remote = sftp.open(Path::new(remote_path)).map_err(|e| {
            if e.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) {
                EtlError::RemoteFileNotFound {
                    path: remote_path.to_string(),
                }
            } else {
                EtlError::SshError(e)
            }
        })?;

        let mut local = File::create(local_path)?;
        let bytes = io::copy(&mut remote, &mut local)?;
        local.sync_all()?;

        if let Err(e) = session.disconnect(None, "download complete", None) {
            tracing::debug!("SFTP disconnect failed: {}", e);
        }
        Ok(bytes)
    }
}

impl RemoteSource for SftpSource {
    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let source = self.clone();
        let remote_path = remote_path.to_string();
        let local_path: PathBuf = local_path.to_path_buf();

        tokio::task::spawn_blocking(move || source.download_blocking(&remote_path, &local_path))
            .await?
    }

    fn describe(&self) -> String {
        format!("sftp://{}@{}:{}", self.username, self.host, self.port)
    }
}
