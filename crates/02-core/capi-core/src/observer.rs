use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::DeviceId;

/// Receives device install/removal notifications.
///
/// Called from the registering thread with no registry lock held.
pub trait DeviceObserver: Send + Sync {
    /// `id` is installed and bound to every live application.
    fn device_added(&self, id: DeviceId);

    /// `id` has been unpublished and is being torn down.
    fn device_removed(&self, id: DeviceId);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct Observers {
    next: AtomicU64,
    entries: RwLock<Vec<(ObserverId, Arc<dyn DeviceObserver>)>>,
}

impl Observers {
    pub(crate) fn attach(&self, observer: Arc<dyn DeviceObserver>) -> ObserverId {
        let id = ObserverId(self.next.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, observer));
        id
    }

    pub(crate) fn detach(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub(crate) fn device_added(&self, id: DeviceId) {
        for observer in self.current() {
            observer.device_added(id);
        }
    }

    pub(crate) fn device_removed(&self, id: DeviceId) {
        for observer in self.current() {
            observer.device_removed(id);
        }
    }

    fn current(&self) -> Vec<Arc<dyn DeviceObserver>> {
        self.entries
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}
