//! Datacenter selection and object lookup by UUID.

use tracing::debug;
use vsess_client::{Datacenter, ManagedObjectReference};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;

/// Pick the datacenter a session is bound to.
///
/// A non-empty name must match a datacenter's inventory name, optionally
/// given as an absolute path (`/DC0`). An empty name selects the server's
/// only datacenter and fails when there are none or several.
pub async fn datacenter_or_default(
    transport: &dyn Transport,
    server: &str,
    name: &str,
) -> Result<Datacenter> {
    let datacenters = transport
        .datacenters()
        .await
        .map_err(|source| Error::Inventory {
            server: server.to_string(),
            source,
        })?;

    let wanted = name.trim().trim_start_matches('/');
    if wanted.is_empty() {
        if datacenters.len() > 1 {
            return Err(Error::AmbiguousDatacenter {
                server: server.to_string(),
                count: datacenters.len(),
            });
        }
        return datacenters
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoDefaultDatacenter {
                server: server.to_string(),
            });
    }

    datacenters
        .into_iter()
        .find(|dc| dc.name == wanted)
        .ok_or_else(|| Error::DatacenterNotFound {
            server: server.to_string(),
            datacenter: name.to_string(),
        })
}

/// Look up a virtual machine by UUID in the session's datacenter.
///
/// `instance_uuid` selects the vCenter instance UUID instead of the BIOS
/// UUID. A miss is `Ok(None)`.
pub async fn resolve_by_uuid(
    session: &Session,
    uuid: &str,
    instance_uuid: bool,
) -> Result<Option<ManagedObjectReference>> {
    let client = session.client().ok_or(Error::NotInitialized)?;
    let datacenter = session.datacenter();

    let found = client
        .find_by_uuid(&datacenter.reference, uuid, instance_uuid)
        .await
        .map_err(|source| Error::Lookup {
            uuid: uuid.to_string(),
            source,
        })?;

    debug!(
        key = %session.key(),
        datacenter = %datacenter.name,
        uuid,
        instance_uuid,
        found = ?found.as_ref().map(|r| r.value.as_str()),
        "resolved object by uuid"
    );
    Ok(found)
}
