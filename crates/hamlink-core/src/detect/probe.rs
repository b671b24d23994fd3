use hamlink_api::{Oid, SnmpTransport};

use crate::containers::system::mib;

/// Baseline answers every SNMP detector starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemProbe {
    pub description: Option<String>,
    pub object_id: Option<Oid>,
}

impl SystemProbe {
    /// Reads `sysDescr` and `sysObjectID` in one request. Missing values
    /// are fine; a failed exchange is not.
    pub async fn fetch(transport: &dyn SnmpTransport) -> Result<Self, hamlink_api::Error> {
        let descr = Oid::from(&mib::SYS_DESCR[..]);
        let object_id = Oid::from(&mib::SYS_OBJECT_ID[..]);
        let varbinds = transport.get(&[descr.clone(), object_id.clone()]).await?;

        let mut probe = Self::default();
        for vb in varbinds.into_iter().filter(|vb| !vb.value.is_exception()) {
            if vb.oid == descr {
                probe.description = vb.value.as_text().map(|d| d.trim().to_owned());
            } else if vb.oid == object_id {
                probe.object_id = vb.value.as_oid().cloned();
            }
        }
        Ok(probe)
    }

    pub fn description_starts_with(&self, prefix: &str) -> bool {
        self.description.as_deref().is_some_and(|d| {
            d.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }

    pub fn object_id_under(&self, root: &[u32]) -> bool {
        self.object_id
            .as_ref()
            .is_some_and(|oid| oid.arcs().starts_with(root))
    }
}
