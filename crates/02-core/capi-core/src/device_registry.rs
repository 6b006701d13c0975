//! Fixed-capacity table of installed devices.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use capi_sync::{Cursor, GuardRef, Guarded, IdPool, SlotTable};
use parking_lot::RwLock;

use crate::device::{Device, DeviceInfo, DeviceRef, Driver};
use crate::error::{DeviceError, DeviceResult};
use crate::DeviceId;

pub(crate) struct DeviceRegistry {
    ids: IdPool,
    /// Holds the registry's own reference to every active device.
    table: RwLock<SlotTable<DeviceRef>>,
    installed: AtomicUsize,
}

impl DeviceRegistry {
    pub(crate) fn new(capacity: u16) -> Self {
        Self {
            ids: IdPool::new(capacity),
            table: RwLock::new(SlotTable::new(capacity)),
            installed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> u16 {
        self.ids.capacity()
    }

    /// Number of devices currently published in the table.
    pub(crate) fn installed(&self) -> usize {
        self.installed.load(Ordering::Acquire)
    }

    /// Allocates an id and publishes a new active device under it.
    pub(crate) fn install(
        &self,
        info: DeviceInfo,
        driver: Arc<dyn Driver>,
    ) -> DeviceResult<Arc<Device>> {
        info.validate()?;
        let capacity = self.capacity();
        let raw = self
            .ids
            .allocate()
            .map_err(|_| DeviceError::TableFull { capacity })?;
        let id = DeviceId::new(raw).ok_or(DeviceError::TableFull { capacity })?;

        let device = Arc::new(Device::new(id, info, driver));
        let owner = GuardRef::adopt(Arc::clone(&device));
        let mut table = self.table.write();
        if table.insert(raw, owner).is_err() {
            // Slots are vacated before their id returns to the pool.
            self.ids.release(raw);
            return Err(DeviceError::TableFull { capacity });
        }
        self.installed.fetch_add(1, Ordering::AcqRel);
        drop(table);
        Ok(device)
    }

    /// Retires `id` and unpublishes it, handing back the registry's reference.
    ///
    /// The id stays allocated until [`free`](Self::free).
    pub(crate) fn retire(&self, id: DeviceId) -> DeviceResult<DeviceRef> {
        let owner = {
            let mut table = self.table.write();
            let owner = table
                .remove(id.get())
                .ok_or(DeviceError::UnknownDevice(id))?;
            owner.lifecycle().retire();
            self.installed.fetch_sub(1, Ordering::AcqRel);
            owner
        };
        Ok(owner)
    }

    /// Returns a drained device's id to the pool.
    pub(crate) fn free(&self, id: DeviceId) {
        self.ids.release(id.get());
    }

    pub(crate) fn get(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.table
            .read()
            .get(id.get())
            .map(|owner| Arc::clone(owner.target()))
    }

    /// Non-blocking counted lookup for restricted contexts.
    ///
    /// Fails on lock contention as well as on missing or retiring devices.
    pub(crate) fn try_acquire(&self, id: DeviceId) -> Option<DeviceRef> {
        let table = self.table.try_read()?;
        GuardRef::try_acquire(table.get(id.get())?.target())
    }

    /// Holds the table exclusively, as a concurrent install or removal does.
    #[cfg(test)]
    pub(crate) fn lock_table(&self) -> parking_lot::RwLockWriteGuard<'_, SlotTable<DeviceRef>> {
        self.table.write()
    }

    /// Device installed after `cursor`, in installation order.
    pub(crate) fn next_after(&self, cursor: Cursor) -> Option<(Cursor, Arc<Device>)> {
        self.table
            .read()
            .next_after(cursor)
            .map(|(next, _, owner)| (next, Arc::clone(owner.target())))
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Device>> {
        self.table
            .read()
            .iter()
            .map(|(_, owner)| Arc::clone(owner.target()))
            .collect()
    }
}
