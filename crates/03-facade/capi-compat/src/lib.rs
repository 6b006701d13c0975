//! Numeric-status CAPI operation table for built-in consumers.
//!
//! Every operation reports a raw 16-bit CAPI info value (0 = no error) and
//! identifies applications by their raw number, the way the classic
//! `capi_interface` function table does.

mod users;

use std::sync::{Arc, Weak};

use capi_core::{
    ApplId, Capi, DeviceObserver, Message, MessageInfo, ObserverId, Profile, RegisterParams,
    SignalHandler, Version,
};
use capi_sync::IdSet;
use log::{debug, warn};

pub use users::{InterfaceUser, DEVADD, DEVREMOVE};

use users::InterfaceUsers;

/// Plain signal callback: application number and the caller's parameter.
pub type SignalFn = fn(u16, u32);

const NO_ERROR: u16 = 0;

/// Operation table over a shared [`Capi`] core.
pub struct KernelCapi {
    core: Arc<Capi>,
    /// Applications registered through this table.
    registered: IdSet,
    users: Arc<InterfaceUsers>,
    observer: ObserverId,
}

impl KernelCapi {
    pub fn new(core: Arc<Capi>) -> Self {
        let users = Arc::new(InterfaceUsers::default());
        let observer = core.attach_observer(Arc::new(Forwarder {
            core: Arc::downgrade(&core),
            users: Arc::clone(&users),
        }));
        Self {
            registered: IdSet::new(core.config().max_applications),
            core,
            users,
            observer,
        }
    }

    pub fn core(&self) -> &Arc<Capi> {
        &self.core
    }

    /// `0` when at least one controller is installed, `NotInstalled` otherwise.
    pub fn is_installed(&self) -> u16 {
        self.core
            .installed()
            .err()
            .map_or(NO_ERROR, MessageInfo::code)
    }

    pub fn register(&self, params: &RegisterParams) -> Result<u16, u16> {
        let id = self.core.register(*params).map_err(|info| info.code())?;
        self.registered.insert(id.get());
        debug!("kernelcapi: registered application {id}");
        Ok(id.get())
    }

    /// Releases the application; returns the error latched at release time.
    pub fn release(&self, applid: u16) -> u16 {
        let id = match self.appl(applid) {
            Ok(id) => id,
            Err(code) => return code,
        };
        // Unpublish before the core frees the id for reuse.
        self.registered.remove(applid);
        let code = match self.core.release(id) {
            Ok(latched) => latched.map_or(NO_ERROR, MessageInfo::code),
            Err(info) => info.code(),
        };
        debug!("kernelcapi: released application {applid} (info {code:#06x})");
        code
    }

    pub fn put_message(&self, applid: u16, msg: Message) -> u16 {
        match self.appl(applid) {
            Ok(id) => capi_core::message_code(&self.core.put_message(id, msg)),
            Err(code) => code,
        }
    }

    pub fn get_message(&self, applid: u16) -> Result<Message, u16> {
        let id = self.appl(applid)?;
        self.core.get_message(id).map_err(MessageInfo::code)
    }

    /// Installs `signal` (or clears it with `None`); `param` is passed back verbatim.
    pub fn set_signal(&self, applid: u16, signal: Option<SignalFn>, param: u32) -> u16 {
        let id = match self.appl(applid) {
            Ok(id) => id,
            Err(code) => return code,
        };
        let handler = signal.map(|signal| {
            SignalHandler::new(u64::from(param), move |id, param| {
                signal(id.get(), param as u32)
            })
        });
        capi_core::message_code(&self.core.set_signal(id, handler))
    }

    pub fn get_version(&self, devid: u32) -> Result<Version, u16> {
        self.core.version(controller(devid)?).map_err(MessageInfo::code)
    }

    pub fn get_serial(&self, devid: u32) -> Result<String, u16> {
        self.core.serial(controller(devid)?).map_err(MessageInfo::code)
    }

    pub fn get_profile(&self, devid: u32) -> Result<Profile, u16> {
        self.core.profile(controller(devid)?).map_err(MessageInfo::code)
    }

    pub fn get_manufacturer(&self, devid: u32) -> Result<String, u16> {
        self.core
            .manufacturer(controller(devid)?)
            .map_err(MessageInfo::code)
    }

    pub fn get_product(&self, devid: u32) -> Result<String, u16> {
        self.core.product(controller(devid)?).map_err(MessageInfo::code)
    }

    /// Adds a user notified of controller add/remove events.
    pub fn attach(&self, user: InterfaceUser) {
        self.users.attach(user);
    }

    /// Removes the user registered under `name`; returns `false` if absent.
    pub fn detach(&self, name: &str) -> bool {
        self.users.detach(name)
    }

    fn appl(&self, applid: u16) -> Result<ApplId, u16> {
        match ApplId::new(applid).filter(|_| self.registered.contains(applid)) {
            Some(id) => Ok(id),
            None => {
                warn!("kernelcapi: illegal application number {applid}");
                Err(MessageInfo::IllegalApplication.code())
            }
        }
    }
}

impl Drop for KernelCapi {
    fn drop(&mut self) {
        self.core.detach_observer(self.observer);
    }
}

fn controller(devid: u32) -> Result<u16, u16> {
    u16::try_from(devid).map_err(|_| MessageInfo::OsResourceError.code())
}

/// Relays core device events to interface users.
struct Forwarder {
    core: Weak<Capi>,
    users: Arc<InterfaceUsers>,
}

impl DeviceObserver for Forwarder {
    fn device_added(&self, id: capi_core::DeviceId) {
        let profile = self
            .core
            .upgrade()
            .and_then(|core| core.profile(id.get()).ok());
        self.users
            .notify(DEVADD, u32::from(id.get()), profile.as_ref());
    }

    fn device_removed(&self, id: capi_core::DeviceId) {
        self.users.notify(DEVREMOVE, u32::from(id.get()), None);
    }
}
