use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::invalidation::ObserverRegistration;
use crate::store::DataStore;
use crate::store::Device;
use crate::store::TableSet;
use crate::Result;

/// The device this process runs on, plus the configuration read with it.
pub struct DeviceRelatedData {
    pub device: Device,
    /// The configured default user exists
    pub has_valid_default_user: bool,
    pub temporarily_allowed_apps: BTreeSet<String>,
    pub experimental_flags: u64,
    registration: ObserverRegistration,
}

impl DeviceRelatedData {
    pub const RELATED_TABLES: TableSet = TableSet::CONFIGURATION_ITEM
        .union(TableSet::DEVICE)
        .union(TableSet::USER)
        .union(TableSet::TEMPORARILY_ALLOWED_APP);

    /// `None` until the own device id is configured and its row exists
    pub fn load<S: DataStore>(store: &S) -> Result<Option<Arc<Self>>> {
        store.run_in_unobserved_transaction(|| {
            let registration = store.invalidation_tracker().register(Self::RELATED_TABLES);

            let Some(device_id) = store.own_device_id()? else {
                return Ok(None);
            };
            let Some(device) = store.device_by_id(&device_id)? else {
                debug!(device = %device_id, "own device row missing");
                return Ok(None);
            };

            let has_valid_default_user = store.user_by_id(&device.default_user)?.is_some();
            let temporarily_allowed_apps = store.temporarily_allowed_apps()?.into_iter().collect();
            let experimental_flags = store.experimental_flags()?;

            Ok(Some(Arc::new(Self {
                device,
                has_valid_default_user,
                temporarily_allowed_apps,
                experimental_flags,
                registration,
            })))
        })
    }

    /// Any related change triggers a full reload. The reloaded snapshot
    /// replaces `self` only if it differs.
    pub fn update<S: DataStore>(
        self: &Arc<Self>,
        store: &S,
    ) -> Result<Option<Arc<Self>>> {
        store.run_in_unobserved_transaction(|| {
            let dirty = self.registration.dirty();
            if dirty.is_empty() {
                return Ok(Some(self.clone()));
            }

            let Some(fresh) = Self::load(store)? else {
                return Ok(None);
            };

            if fresh.same_content(self) {
                trace!(device = %self.device.id, ?dirty, "device related data unchanged");
                self.registration.acknowledge(dirty);
                return Ok(Some(self.clone()));
            }

            Ok(Some(fresh))
        })
    }

    fn same_content(
        &self,
        other: &Self,
    ) -> bool {
        self.device == other.device
            && self.has_valid_default_user == other.has_valid_default_user
            && self.temporarily_allowed_apps == other.temporarily_allowed_apps
            && self.experimental_flags == other.experimental_flags
    }

    pub fn can_switch_to_default_user(&self) -> bool {
        self.has_valid_default_user && self.device.current_user_id != self.device.default_user
    }

    /// All bits of `flags` are set
    pub fn is_experimental_flag_set(
        &self,
        flags: u64,
    ) -> bool {
        (self.experimental_flags & flags) == flags
    }

    pub fn is_temporarily_allowed(
        &self,
        package_name: &str,
    ) -> bool {
        self.temporarily_allowed_apps.contains(package_name)
    }
}

impl fmt::Debug for DeviceRelatedData {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DeviceRelatedData")
            .field("device", &self.device)
            .field("has_valid_default_user", &self.has_valid_default_user)
            .field("temporarily_allowed_apps", &self.temporarily_allowed_apps)
            .field("experimental_flags", &self.experimental_flags)
            .finish_non_exhaustive()
    }
}
