use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use super::codec::{encode_sentence, parse_attribute, read_sentence};
use super::{VendorConnector, VendorRecord, VendorSession};
use crate::error::Error;

/// Raw API client over one TCP connection.
///
/// Commands are serialized through the connection lock; the API allows
/// tagged pipelining but device queries never need it.
pub struct RouterOsClient {
    target: SocketAddr,
    timeout: Duration,
    stream: Mutex<BufReader<TcpStream>>,
}

impl fmt::Debug for RouterOsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOsClient")
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RouterOsClient {
    /// Connects and logs in with the post-6.43 plaintext method.
    pub async fn connect(
        target: SocketAddr,
        user: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(target))
            .await
            .map_err(|_| Error::VendorTimeout { target })?
            .map_err(|source| Error::VendorConnect { target, source })?;

        let client = Self {
            target,
            timeout,
            stream: Mutex::new(BufReader::new(stream)),
        };

        let name = format!("=name={user}");
        let pass = format!("=password={}", password.expose_secret());
        match client.exchange(&["/login", &name, &pass]).await {
            Ok(done) => {
                if done.iter().any(|record| record.contains_key("ret")) {
                    return Err(Error::VendorLogin {
                        message: "challenge login (RouterOS before 6.43) is not supported".into(),
                    });
                }
            }
            Err(Error::VendorTrap { message, .. }) => return Err(Error::VendorLogin { message }),
            Err(e) => return Err(e),
        }

        debug!(target = %target, user, "RouterOS API login succeeded");
        Ok(client)
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    async fn exchange(&self, words: &[&str]) -> Result<Vec<VendorRecord>, Error> {
        tokio::time::timeout(self.timeout, self.exchange_inner(words))
            .await
            .map_err(|_| Error::VendorTimeout {
                target: self.target,
            })?
    }

    /// Writes one sentence and collects replies until `!done`.
    ///
    /// `!re` sentences become records; the attributes of `!done` itself are
    /// returned as a final record when present (login challenge, `=ret=`).
    async fn exchange_inner(&self, words: &[&str]) -> Result<Vec<VendorRecord>, Error> {
        let command = words.first().copied().unwrap_or_default();
        let mut stream = self.stream.lock().await;
        stream.get_mut().write_all(&encode_sentence(words)).await?;
        stream.get_mut().flush().await?;

        let mut records = Vec::new();
        let mut trap: Option<String> = None;
        loop {
            let sentence = read_sentence(&mut *stream).await?;
            let Some((reply, attributes)) = sentence.split_first() else {
                continue;
            };
            let record: VendorRecord = attributes
                .iter()
                .filter_map(|word| parse_attribute(word))
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            match reply.as_str() {
                "!re" => records.push(record),
                "!trap" => {
                    trap.get_or_insert_with(|| {
                        record
                            .get("message")
                            .cloned()
                            .unwrap_or_else(|| "unknown error".into())
                    });
                }
                "!done" => {
                    if let Some(message) = trap {
                        return Err(Error::VendorTrap {
                            command: command.to_owned(),
                            message,
                        });
                    }
                    if !record.is_empty() {
                        records.push(record);
                    }
                    return Ok(records);
                }
                "!fatal" => {
                    let message = attributes.first().cloned().unwrap_or_default();
                    return Err(Error::VendorProtocol(format!(
                        "connection closed by device: {message}"
                    )));
                }
                other => {
                    return Err(Error::VendorProtocol(format!(
                        "unexpected reply word '{other}'"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl VendorSession for RouterOsClient {
    async fn run(&self, words: &[&str]) -> Result<Vec<VendorRecord>, Error> {
        self.exchange(words).await
    }
}

/// Connects to the RouterOS API port of any device with fixed credentials.
#[derive(Debug, Clone)]
pub struct RouterOsConnector {
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub timeout: Duration,
}

impl RouterOsConnector {
    pub const DEFAULT_PORT: u16 = 8728;

    pub fn new(user: impl Into<String>, password: SecretString) -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            user: user.into(),
            password,
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl VendorConnector for RouterOsConnector {
    async fn connect(&self, address: IpAddr) -> Result<Arc<dyn VendorSession>, Error> {
        let client = RouterOsClient::connect(
            SocketAddr::new(address, self.port),
            &self.user,
            &self.password,
            self.timeout,
        )
        .await?;
        Ok(Arc::new(client))
    }
}
