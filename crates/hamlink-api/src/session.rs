// ── UDP transport over snmp2 ──
//
// One boxed `AsyncSession` per transport, opened lazily and reopened
// whenever the protocol version changes or an exchange times out (a late
// answer to an abandoned request must not be mistaken for the next one).

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use snmp2::snmp::{ERRSTATUS_NOERROR, ERRSTATUS_NOSUCHNAME, ERRSTATUS_TOOBIG};
use snmp2::{AsyncSession, Value};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::Error;
use crate::oid::Oid;
use crate::transport::{QueryLimits, SnmpTransport, TransportConfig, VarBind};
use crate::value::SnmpValue;
use crate::version::SnmpVersion;

#[derive(Clone, Copy)]
enum Exchange<'a> {
    Get(&'a Oid),
    GetMany(&'a [Oid]),
    GetNext(&'a Oid),
    GetBulk(&'a Oid, u32),
}

/// A decoded response PDU.
struct Reply {
    status: u32,
    varbinds: Vec<VarBind>,
}

struct OpenSession {
    version: SnmpVersion,
    session: Box<AsyncSession>,
}

/// SNMP v1/v2c transport bound to one agent address.
pub struct UdpTransport {
    target: SocketAddr,
    config: TransportConfig,
    version: AtomicU8,
    session: Mutex<Option<OpenSession>>,
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpTransport")
            .field("target", &self.target)
            .field("version", &self.protocol_version())
            .field("timeout", &self.config.timeout)
            .field("retries", &self.config.retries)
            .finish_non_exhaustive()
    }
}

impl UdpTransport {
    pub fn new(address: IpAddr, config: TransportConfig) -> Self {
        Self {
            target: SocketAddr::new(address, config.port),
            version: AtomicU8::new(config.version.to_u8()),
            config,
            session: Mutex::new(None),
        }
    }

    async fn open(&self, version: SnmpVersion) -> Result<Box<AsyncSession>, Error> {
        let community = self.config.community.expose_secret().as_bytes();
        let opened = match version {
            SnmpVersion::V1 => AsyncSession::new_v1(self.target, community, 0).await,
            SnmpVersion::V2c => AsyncSession::new_v2c(self.target, community, 0).await,
            SnmpVersion::V3 => return Err(Error::UnsupportedVersion { version }),
        };
        opened.map(Box::new).map_err(|source| Error::Session {
            target: self.target,
            source,
        })
    }

    /// Runs one exchange under the session lock, retrying on timeout until
    /// `retries` is exhausted.
    async fn exchange(&self, op: Exchange<'_>) -> Result<Reply, Error> {
        let attempts = self.config.retries.saturating_add(1);
        let version = self.protocol_version();
        let mut guard = self.session.lock().await;

        for attempt in 1..=attempts {
            if guard.as_ref().is_none_or(|open| open.version != version) {
                let session = self.open(version).await?;
                *guard = Some(OpenSession { version, session });
            }
            let Some(open) = guard.as_mut() else {
                continue;
            };

            let pending = run(&mut open.session, op);
            match tokio::time::timeout(self.config.timeout, pending).await {
                Ok(result) => {
                    return result.map_err(|message| self.request_error(message));
                }
                Err(_) => {
                    debug!(target = %self.target, attempt, "SNMP exchange timed out");
                    *guard = None;
                }
            }
        }
        Err(Error::Timeout {
            target: self.target.ip(),
            attempts,
        })
    }

    fn request_error(&self, message: impl Into<String>) -> Error {
        Error::Request {
            target: self.target.ip(),
            message: message.into(),
        }
    }

    fn refused(&self, status: u32) -> Error {
        self.request_error(format!("agent answered with error status {status}"))
    }

    /// One GET per OID. A v1 `noSuchName` marks the value as missing.
    async fn get_each(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            let reply = self.exchange(Exchange::Get(oid)).await?;
            match reply.status {
                ERRSTATUS_NOERROR if !reply.varbinds.is_empty() => {
                    out.extend(reply.varbinds);
                }
                ERRSTATUS_NOERROR | ERRSTATUS_NOSUCHNAME => {
                    out.push(VarBind::new(oid.clone(), SnmpValue::NoSuchInstance));
                }
                status => return Err(self.refused(status)),
            }
        }
        Ok(out)
    }
}

async fn run(session: &mut AsyncSession, op: Exchange<'_>) -> Result<Reply, String> {
    let pdu = match op {
        Exchange::Get(oid) => session.get(&to_wire(oid)?).await,
        Exchange::GetMany(oids) => {
            let wire = oids.iter().map(to_wire).collect::<Result<Vec<_>, _>>()?;
            let refs: Vec<_> = wire.iter().collect();
            session.get_many(&refs).await
        }
        Exchange::GetNext(oid) => session.getnext(&to_wire(oid)?).await,
        Exchange::GetBulk(oid, max_repetitions) => {
            session
                .getbulk(&[&to_wire(oid)?], 0, max_repetitions)
                .await
        }
    };
    let pdu = pdu.map_err(|e| format!("{e}"))?;
    trace!(status = pdu.error_status, "SNMP response received");

    let mut varbinds = Vec::new();
    for (oid, value) in pdu.varbinds {
        let oid: Oid = oid
            .to_string()
            .parse()
            .map_err(|e: Error| e.to_string())?;
        varbinds.push(VarBind {
            oid,
            value: from_wire(&value),
        });
    }
    Ok(Reply {
        status: pdu.error_status,
        varbinds,
    })
}

fn to_wire(oid: &Oid) -> Result<snmp2::Oid<'static>, String> {
    let arcs: Vec<u64> = oid.arcs().iter().map(|&arc| u64::from(arc)).collect();
    snmp2::Oid::from(&arcs).map_err(|e| format!("cannot encode OID {oid}: {e:?}"))
}

fn from_wire(value: &Value<'_>) -> SnmpValue {
    match value {
        Value::Integer(v) => SnmpValue::Integer(*v),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(oid) => oid
            .to_string()
            .parse()
            .map_or(SnmpValue::Null, SnmpValue::ObjectIdentifier),
        Value::IpAddress(octets) => SnmpValue::IpAddress((*octets).into()),
        Value::Counter32(v) => SnmpValue::Counter32(*v),
        Value::Unsigned32(v) => SnmpValue::Gauge32(*v),
        Value::Timeticks(v) => SnmpValue::TimeTicks(*v),
        Value::Counter64(v) => SnmpValue::Counter64(*v),
        Value::Opaque(bytes) => SnmpValue::Opaque(bytes.to_vec()),
        Value::NoSuchObject => SnmpValue::NoSuchObject,
        Value::NoSuchInstance => SnmpValue::NoSuchInstance,
        Value::EndOfMibView => SnmpValue::EndOfMibView,
        _ => SnmpValue::Null,
    }
}

#[async_trait]
impl SnmpTransport for UdpTransport {
    fn target(&self) -> IpAddr {
        self.target.ip()
    }

    fn protocol_version(&self) -> SnmpVersion {
        SnmpVersion::from_u8(self.version.load(Ordering::Acquire))
    }

    fn set_protocol_version(&self, version: SnmpVersion) {
        self.version.store(version.to_u8(), Ordering::Release);
    }

    fn limits(&self) -> QueryLimits {
        self.config.limits
    }

    /// One batched GET. Agents that refuse the batch (`tooBig`, or a v1
    /// `noSuchName` for one of its OIDs) are asked again one OID at a time.
    async fn get_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        match oids {
            [] => Ok(Vec::new()),
            [_] => self.get_each(oids).await,
            _ => {
                let reply = self.exchange(Exchange::GetMany(oids)).await?;
                match reply.status {
                    ERRSTATUS_NOERROR => Ok(reply.varbinds),
                    ERRSTATUS_TOOBIG | ERRSTATUS_NOSUCHNAME => {
                        debug!(
                            target = %self.target,
                            status = reply.status,
                            count = oids.len(),
                            "batched GET refused, asking per OID"
                        );
                        self.get_each(oids).await
                    }
                    status => Err(self.refused(status)),
                }
            }
        }
    }

    async fn get_next_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            let reply = self.exchange(Exchange::GetNext(oid)).await?;
            match reply.status {
                ERRSTATUS_NOERROR => out.extend(reply.varbinds),
                // v1 signals the end of the MIB this way.
                ERRSTATUS_NOSUCHNAME => {
                    out.push(VarBind::new(oid.clone(), SnmpValue::EndOfMibView));
                }
                status => return Err(self.refused(status)),
            }
        }
        Ok(out)
    }

    async fn get_bulk_request(
        &self,
        oid: &Oid,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, Error> {
        let reply = self
            .exchange(Exchange::GetBulk(oid, max_repetitions))
            .await?;
        match reply.status {
            ERRSTATUS_NOERROR => Ok(reply.varbinds),
            status => Err(self.refused(status)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::net::UdpSocket;

    use super::*;

    /// Loopback agent echoing each request back as a response, with the
    /// error status chosen from the request's varbind count. Returns its
    /// address and the number of datagrams received.
    async fn echo_agent(status: fn(usize) -> u32) -> (SocketAddr, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = socket.local_addr().unwrap();
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                counter.fetch_add(1, Ordering::SeqCst);
                let Ok(mut pdu) = snmp2::Pdu::from_bytes(&buf[..len]) else {
                    continue;
                };
                let count = pdu.varbinds.clone().count();
                pdu.message_type = snmp2::MessageType::Response;
                pdu.error_status = status(count);
                let reply = pdu.to_bytes().unwrap();
                socket.send_to(&reply, peer).await.unwrap();
            }
        });
        (address, received)
    }

    fn transport_for(agent: SocketAddr) -> UdpTransport {
        UdpTransport::new(
            agent.ip(),
            TransportConfig {
                port: agent.port(),
                timeout: Duration::from_secs(2),
                retries: 0,
                ..TransportConfig::default()
            },
        )
    }

    fn interface_oids() -> Vec<Oid> {
        ["1.3.6.1.2.1.2.2.1.2.1", "1.3.6.1.2.1.2.2.1.2.2", "1.3.6.1.2.1.2.2.1.2.3"]
            .iter()
            .map(|text| text.parse().unwrap())
            .collect()
    }

    #[test]
    fn wire_oid_round_trips_through_text() {
        let oid: Oid = "1.3.6.1.4.1.41112.1.4.7.1.3.5.0.39.34.1.2.3"
            .parse()
            .unwrap();
        let wire = to_wire(&oid).unwrap();
        assert_eq!(wire.to_string().parse::<Oid>().unwrap(), oid);
    }

    #[test]
    fn converts_wire_values() {
        assert_eq!(from_wire(&Value::Integer(-64)), SnmpValue::Integer(-64));
        assert_eq!(
            from_wire(&Value::OctetString(b"wlan1")),
            SnmpValue::from("wlan1")
        );
        assert_eq!(from_wire(&Value::Timeticks(100)), SnmpValue::TimeTicks(100));
        assert_eq!(from_wire(&Value::NoSuchInstance), SnmpValue::NoSuchInstance);
    }

    #[tokio::test]
    async fn v3_is_refused() {
        let transport = UdpTransport::new(
            "127.0.0.1".parse().unwrap(),
            TransportConfig {
                version: SnmpVersion::V3,
                ..TransportConfig::default()
            },
        );
        let err = transport
            .get_request(&["1.3.6.1.2.1.1.1.0".parse().unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    // ── Exchanges against a live socket ──

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batched_get_uses_one_datagram_from_a_worker_task() {
        let (agent, received) = echo_agent(|_| ERRSTATUS_NOERROR).await;
        let oids = interface_oids();

        let expected = oids.clone();
        let answered = tokio::spawn(async move {
            let transport = transport_for(agent);
            transport.get_request(&oids).await.unwrap()
        })
        .await
        .unwrap();

        let answered: Vec<Oid> = answered.into_iter().map(|vb| vb.oid).collect();
        assert_eq!(answered, expected);
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn too_big_batch_is_retried_per_oid() {
        let (agent, received) = echo_agent(|count| {
            if count > 1 {
                ERRSTATUS_TOOBIG
            } else {
                ERRSTATUS_NOERROR
            }
        })
        .await;
        let transport = transport_for(agent);
        let oids = interface_oids();

        let answered = transport.get_request(&oids).await.unwrap();

        let answered: Vec<Oid> = answered.into_iter().map(|vb| vb.oid).collect();
        assert_eq!(answered, oids);
        assert_eq!(received.load(Ordering::SeqCst), 1 + oids.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_such_name_on_a_single_get_marks_the_value_missing() {
        let (agent, _) = echo_agent(|_| ERRSTATUS_NOSUCHNAME).await;
        let transport = transport_for(agent);
        let oid: Oid = "1.3.6.1.4.1.41112.1.4.1.1.4.1".parse().unwrap();

        let answered = transport.get_request(&[oid.clone()]).await.unwrap();

        assert_eq!(answered, vec![VarBind::new(oid, SnmpValue::NoSuchInstance)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn other_error_status_fails_the_request() {
        let (agent, _) = echo_agent(|_| 5).await;
        let transport = transport_for(agent);

        let err = transport.get_request(&interface_oids()).await.unwrap_err();

        assert!(matches!(err, Error::Request { .. }), "{err:?}");
        assert!(err.to_string().contains("error status 5"), "{err}");
    }
}
