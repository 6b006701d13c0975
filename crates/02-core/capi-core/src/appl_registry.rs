//! Registered applications in registration order.

use std::sync::Arc;

use capi_sync::{Cursor, GuardRef, Guarded, IdPool, SlotTable};
use parking_lot::RwLock;

use crate::appl::{ApplRef, Application, RegisterParams, MIN_DATA_BLOCK_LEN};
use crate::info::{MessageInfo, RegisterInfo};
use crate::ApplId;

pub(crate) struct ApplRegistry {
    ids: IdPool,
    /// Holds the registry's own reference to every live application.
    table: RwLock<SlotTable<ApplRef>>,
    max_devices: u16,
}

impl ApplRegistry {
    pub(crate) fn new(capacity: u16, max_devices: u16) -> Self {
        Self {
            ids: IdPool::new(capacity),
            table: RwLock::new(SlotTable::new(capacity)),
            max_devices,
        }
    }

    pub(crate) fn install(&self, params: RegisterParams) -> Result<Arc<Application>, RegisterInfo> {
        if params.data_block_len < MIN_DATA_BLOCK_LEN {
            return Err(RegisterInfo::LogicalBlockSizeTooSmall);
        }
        let raw = self
            .ids
            .allocate()
            .map_err(|_| RegisterInfo::TooManyApplications)?;
        let id = ApplId::new(raw).ok_or(RegisterInfo::OsResourceError)?;

        let appl = Arc::new(Application::new(id, params, self.max_devices));
        let owner = GuardRef::adopt(Arc::clone(&appl));
        if self.table.write().insert(raw, owner).is_err() {
            self.ids.release(raw);
            return Err(RegisterInfo::OsResourceError);
        }
        Ok(appl)
    }

    /// Retires `id` and unpublishes it, handing back the registry's reference.
    pub(crate) fn retire(&self, id: ApplId) -> Option<ApplRef> {
        let mut table = self.table.write();
        let owner = table.remove(id.get())?;
        owner.lifecycle().retire();
        Some(owner)
    }

    pub(crate) fn free(&self, id: ApplId) {
        self.ids.release(id.get());
    }

    pub(crate) fn get(&self, id: ApplId) -> Option<Arc<Application>> {
        self.table
            .read()
            .get(id.get())
            .map(|owner| Arc::clone(owner.target()))
    }

    /// Counted lookup for client calls.
    pub(crate) fn acquire(&self, id: ApplId) -> Result<ApplRef, MessageInfo> {
        let table = self.table.read();
        let owner = table.get(id.get()).ok_or(MessageInfo::IllegalApplication)?;
        GuardRef::try_acquire(owner.target()).ok_or(MessageInfo::IllegalApplication)
    }

    /// Holds the table exclusively, as a concurrent register or release does.
    #[cfg(test)]
    pub(crate) fn lock_table(&self) -> parking_lot::RwLockWriteGuard<'_, SlotTable<ApplRef>> {
        self.table.write()
    }

    /// Non-blocking counted lookup; lock contention maps to `OsResourceError`.
    pub(crate) fn try_acquire(&self, id: ApplId) -> Result<ApplRef, MessageInfo> {
        let table = self.table.try_read().ok_or(MessageInfo::OsResourceError)?;
        let owner = table.get(id.get()).ok_or(MessageInfo::IllegalApplication)?;
        GuardRef::try_acquire(owner.target()).ok_or(MessageInfo::IllegalApplication)
    }

    /// Application registered after `cursor`, in registration order.
    pub(crate) fn next_after(&self, cursor: Cursor) -> Option<(Cursor, Arc<Application>)> {
        self.table
            .read()
            .next_after(cursor)
            .map(|(next, _, owner)| (next, Arc::clone(owner.target())))
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Application>> {
        self.table
            .read()
            .iter()
            .map(|(_, owner)| Arc::clone(owner.target()))
            .collect()
    }
}
