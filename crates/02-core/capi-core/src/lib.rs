//! Registry and message dispatch core for CAPI controllers.
//!
//! Drivers install devices, clients register applications, and the core keeps
//! every application bound to every device it was able to register with. The
//! router moves messages between the two sides.
//!
//! Teardown is quiescent: [`Capi::unregister_device`] and [`Capi::release`]
//! block until no call into the driver for that record is running or can
//! start. The routing entry points used from restricted contexts
//! ([`Capi::put_message`], [`Application::enqueue`], [`Application::signal`],
//! [`Application::signal_error`]) never block.

mod appl;
mod appl_registry;
mod binding;
mod config;
mod device;
mod device_registry;
mod error;
mod ids;
mod info;
pub mod message;
mod observer;
mod query;
mod router;
mod snapshot;
mod stats;

use std::sync::Arc;

use capi_sync::Guarded;
use tracing::{debug, info};

pub use appl::{ApplRef, Application, RegisterParams, SignalHandler, MIN_DATA_BLOCK_LEN};
pub use config::{CoreConfig, DEFAULT_MAX_APPLICATIONS, DEFAULT_MAX_DEVICES};
pub use device::{
    Device, DeviceInfo, DeviceRef, DeviceState, Driver, Profile, Version, MANUFACTURER_LEN,
    SERIAL_LEN,
};
pub use error::{ConfigError, DeviceError, DeviceResult};
pub use ids::{ApplId, DeviceId};
pub use info::{message_code, register_code, MessageInfo, RegisterInfo};
pub use message::Message;
pub use observer::{DeviceObserver, ObserverId};
pub use query::{CORE_MANUFACTURER, CORE_PRODUCT, CORE_SERIAL, CORE_VERSION};
pub use snapshot::{ApplSnapshot, DeviceSnapshot};
pub use stats::{DirectionSnapshot, IoStatsSnapshot};

use appl_registry::ApplRegistry;
use device_registry::DeviceRegistry;
use observer::Observers;

/// The device/application registry.
pub struct Capi {
    config: CoreConfig,
    devices: DeviceRegistry,
    appls: ApplRegistry,
    observers: Observers,
}

impl Capi {
    pub fn new(config: CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            devices: DeviceRegistry::new(config.max_devices),
            appls: ApplRegistry::new(config.max_applications, config.max_devices),
            observers: Observers::default(),
        })
    }

    pub fn config(&self) -> CoreConfig {
        self.config
    }

    /// Installs a device and registers every live application with it.
    ///
    /// Per-application register failures are logged and leave that pair
    /// unbound; they do not fail the installation.
    pub fn register_device(
        &self,
        info: DeviceInfo,
        driver: Arc<dyn Driver>,
    ) -> DeviceResult<DeviceId> {
        let device = self.devices.install(info, driver)?;
        let id = device.id();
        info!(
            device = %id,
            manufacturer = %device.info().manufacturer,
            product = %device.info().product,
            "device installed"
        );
        let bound = binding::bind_device_to_all_appls(&device, &self.appls);
        debug!(device = %id, bound, "device bound to applications");
        self.observers.device_added(id);
        Ok(id)
    }

    /// Removes a device and blocks until nothing references it.
    ///
    /// Bindings still held by applications are dropped without invoking the
    /// driver's release callback. When this returns no call into the
    /// device's driver is running and none will start.
    pub fn unregister_device(&self, id: DeviceId) -> DeviceResult<()> {
        let owner = self.devices.retire(id)?;
        info!(device = %id, "device unregistering");
        self.observers.device_removed(id);

        for appl in self.appls.snapshot() {
            if appl.detach(id).is_some() {
                debug!(device = %id, appl = %appl.id(), "binding detached");
            }
        }

        let device = Arc::clone(owner.target());
        drop(owner);
        device.lifecycle().wait_until_unreferenced();
        self.devices.free(id);
        info!(device = %id, "device removed");
        Ok(())
    }

    /// Registers an application and binds it to every active device.
    pub fn register(&self, params: RegisterParams) -> Result<ApplId, RegisterInfo> {
        let appl = self.appls.install(params)?;
        let id = appl.id();
        let bound = binding::bind_appl_to_all_devices(&appl, &self.devices);
        debug!(appl = %id, bound, ?params, "application registered");
        Ok(id)
    }

    /// Releases an application, unwinding every binding.
    ///
    /// Blocks until in-flight calls on the application have finished. Devices
    /// that are already retiring are not called back. Returns the error that
    /// was latched at the time of release.
    pub fn release(&self, id: ApplId) -> Result<Option<MessageInfo>, MessageInfo> {
        let owner = self
            .appls
            .retire(id)
            .ok_or(MessageInfo::IllegalApplication)?;
        let appl = Arc::clone(owner.target());
        drop(owner);
        appl.lifecycle().wait_until_unreferenced();

        for device in appl.take_links() {
            if device.lifecycle().is_retiring() {
                debug!(device = %device.id(), appl = %id, "skipping release on retiring device");
                continue;
            }
            device.driver().release(&device, &appl);
            debug!(device = %device.id(), appl = %id, "binding released");
        }

        let purged = appl.reset();
        let latched = appl.latched_error();
        self.appls.free(id);
        debug!(appl = %id, purged, ?latched, "application released");
        Ok(latched)
    }

    /// The installed device with this id.
    pub fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    /// The registered application with this id.
    pub fn application(&self, id: ApplId) -> Option<Arc<Application>> {
        self.appls.get(id)
    }

    pub fn attach_observer(&self, observer: Arc<dyn DeviceObserver>) -> ObserverId {
        self.observers.attach(observer)
    }

    /// Returns `false` if `id` was not attached.
    pub fn detach_observer(&self, id: ObserverId) -> bool {
        self.observers.detach(id)
    }

    /// Installed devices in installation order.
    pub fn device_snapshots(&self) -> Vec<DeviceSnapshot> {
        self.devices
            .snapshot()
            .iter()
            .map(|device| DeviceSnapshot::capture(device))
            .collect()
    }

    /// Registered applications in registration order.
    pub fn appl_snapshots(&self) -> Vec<ApplSnapshot> {
        self.appls
            .snapshot()
            .iter()
            .map(|appl| ApplSnapshot::capture(appl))
            .collect()
    }
}

impl Default for Capi {
    fn default() -> Self {
        let config = CoreConfig::default();
        Self {
            config,
            devices: DeviceRegistry::new(config.max_devices),
            appls: ApplRegistry::new(config.max_applications, config.max_devices),
            observers: Observers::default(),
        }
    }
}
