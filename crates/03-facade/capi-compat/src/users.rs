use std::fmt;
use std::sync::Arc;

use capi_core::Profile;
use log::debug;
use parking_lot::RwLock;

/// A controller was installed.
pub const DEVADD: u32 = 0;
/// A controller is being removed.
pub const DEVREMOVE: u32 = 1;

type Callback = Box<dyn Fn(u32, u32, Option<&Profile>) + Send + Sync>;

/// A named consumer of controller add/remove events.
///
/// The callback receives the event code, the controller number and, for
/// [`DEVADD`], the controller's profile.
pub struct InterfaceUser {
    name: String,
    callback: Callback,
}

impl InterfaceUser {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(u32, u32, Option<&Profile>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for InterfaceUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceUser")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub(crate) struct InterfaceUsers {
    users: RwLock<Vec<Arc<InterfaceUser>>>,
}

impl InterfaceUsers {
    /// Most recently attached users are notified first.
    pub(crate) fn attach(&self, user: InterfaceUser) {
        debug!("kernelcapi: attaching interface user {}", user.name);
        self.users.write().insert(0, Arc::new(user));
    }

    pub(crate) fn detach(&self, name: &str) -> bool {
        let mut users = self.users.write();
        let before = users.len();
        users.retain(|user| user.name != name);
        users.len() != before
    }

    /// Callbacks run without the list lock held and may attach or detach users.
    pub(crate) fn notify(&self, cmd: u32, controller: u32, profile: Option<&Profile>) {
        let users: Vec<_> = self.users.read().iter().map(Arc::clone).collect();
        for user in users {
            (user.callback)(cmd, controller, profile);
        }
    }
}
