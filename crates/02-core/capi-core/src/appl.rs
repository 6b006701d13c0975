//! Application records: queue, error latch, signal and device links.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use capi_sync::{GuardRef, Guarded, IdSet, LifecycleGuard};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::trace;

use crate::device::DeviceRef;
use crate::info::MessageInfo;
use crate::message::{Message, Traffic};
use crate::stats::{IoStats, IoStatsSnapshot};
use crate::{ApplId, DeviceId};

/// Smallest accepted `data_block_len`.
pub const MIN_DATA_BLOCK_LEN: u32 = 128;

/// Resources an application asks for when registering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegisterParams {
    /// Maximum number of concurrent logical (B3) connections.
    pub level3_connections: u32,
    /// Maximum number of outstanding data blocks per connection.
    pub data_blocks: u32,
    /// Maximum size of one data block.
    pub data_block_len: u32,
}

/// Wake-up callback invoked with the application id and an opaque parameter.
pub struct SignalHandler {
    callback: Box<dyn Fn(ApplId, u64) + Send + Sync>,
    param: u64,
}

impl SignalHandler {
    pub fn new<F>(param: u64, callback: F) -> Self
    where
        F: Fn(ApplId, u64) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            param,
        }
    }

    pub fn param(&self) -> u64 {
        self.param
    }
}

impl fmt::Debug for SignalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHandler")
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// Counted reference to a registered application.
pub type ApplRef = GuardRef<Application>;

#[derive(Default)]
struct Links {
    /// Devices whose register callback is currently running for this application.
    pending: SmallVec<[DeviceId; 4]>,
    bound: BTreeMap<DeviceId, DeviceRef>,
}

/// A registered client.
pub struct Application {
    id: ApplId,
    params: RegisterParams,
    /// Lock-free mirror of `links.bound` for the routing path.
    bound: IdSet,
    links: Mutex<Links>,
    queue_tx: Sender<Message>,
    queue_rx: Receiver<Message>,
    latched: AtomicU16,
    signal: ArcSwapOption<SignalHandler>,
    lifecycle: LifecycleGuard,
    stats: IoStats,
}

impl Application {
    pub(crate) fn new(id: ApplId, params: RegisterParams, max_devices: u16) -> Self {
        let (queue_tx, queue_rx) = crossbeam_channel::unbounded();
        Self {
            id,
            params,
            bound: IdSet::new(max_devices),
            links: Mutex::new(Links::default()),
            queue_tx,
            queue_rx,
            latched: AtomicU16::new(0),
            signal: ArcSwapOption::empty(),
            lifecycle: LifecycleGuard::new(),
            stats: IoStats::new(),
        }
    }

    pub fn id(&self) -> ApplId {
        self.id
    }

    pub fn params(&self) -> RegisterParams {
        self.params
    }

    /// Returns `true` while the application is bound to `device`.
    pub fn is_bound(&self, device: DeviceId) -> bool {
        self.bound.contains(device.get())
    }

    /// Bound devices in ascending id order.
    pub fn bound_devices(&self) -> SmallVec<[DeviceId; 4]> {
        self.bound.iter().filter_map(DeviceId::new).collect()
    }

    /// The sticky error set by [`signal_error`](Self::signal_error), if any.
    pub fn latched_error(&self) -> Option<MessageInfo> {
        MessageInfo::from_code(self.latched.load(Ordering::Acquire))
    }

    pub fn queue_len(&self) -> usize {
        self.queue_rx.len()
    }

    pub fn stats(&self) -> IoStatsSnapshot {
        self.stats.snapshot()
    }

    /// Appends `msg` to the queue and wakes the application. Never blocks.
    ///
    /// Messages arriving after release has started are dropped and `false`
    /// is returned.
    pub fn enqueue(&self, msg: Message) -> bool {
        if self.lifecycle.is_retiring() {
            trace!(appl = %self.id, "dropping message for released application");
            return false;
        }
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.queue_tx.send(msg);
        trace!(appl = %self.id, depth = self.queue_rx.len(), "queued message");
        self.signal();
        true
    }

    /// Invokes the registered wake-up callback, if any.
    pub fn signal(&self) {
        if let Some(handler) = self.signal.load().as_ref() {
            (handler.callback)(self.id, handler.param);
        }
    }

    /// Latches `info` unless an error is already latched, then signals.
    pub fn signal_error(&self, info: MessageInfo) {
        let latched = self
            .latched
            .compare_exchange(0, info.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        trace!(appl = %self.id, info = %info.code(), latched, "error signalled");
        self.signal();
    }

    pub(crate) fn set_signal(&self, handler: Option<SignalHandler>) {
        self.signal.store(handler.map(Arc::new));
    }

    pub(crate) fn dequeue(&self) -> Option<Message> {
        let msg = self.queue_rx.try_recv().ok()?;
        self.stats.record_rx(msg.traffic());
        Some(msg)
    }

    pub(crate) fn record_tx(&self, traffic: Traffic) {
        self.stats.record_tx(traffic);
    }

    /// Claims the `(device, self)` pair for a register callback.
    ///
    /// Fails if the pair is already bound or another binder holds the claim.
    pub(crate) fn claim(&self, device: DeviceId) -> bool {
        let mut links = self.links.lock();
        if links.bound.contains_key(&device) || links.pending.contains(&device) {
            return false;
        }
        links.pending.push(device);
        true
    }

    /// Drops a claim whose register callback failed.
    pub(crate) fn abandon(&self, device: DeviceId) {
        self.links.lock().pending.retain(|pending| *pending != device);
    }

    /// Turns a successful claim into a binding that owns `device`.
    ///
    /// A device that started retiring meanwhile is not bound; its reference
    /// is handed back so the caller drops it outside the lock.
    pub(crate) fn commit(&self, device: DeviceRef) -> Result<(), DeviceRef> {
        let id = device.id();
        let mut links = self.links.lock();
        links.pending.retain(|pending| *pending != id);
        if device.lifecycle().is_retiring() {
            return Err(device);
        }
        self.bound.insert(id.get());
        links.bound.insert(id, device);
        Ok(())
    }

    /// Unbinds `device` without a release callback.
    pub(crate) fn detach(&self, device: DeviceId) -> Option<DeviceRef> {
        let mut links = self.links.lock();
        let device_ref = links.bound.remove(&device)?;
        self.bound.remove(device.get());
        Some(device_ref)
    }

    /// Unbinds every device, returning the references in ascending id order.
    pub(crate) fn take_links(&self) -> Vec<DeviceRef> {
        let mut links = self.links.lock();
        for id in links.bound.keys() {
            self.bound.remove(id.get());
        }
        std::mem::take(&mut links.bound).into_values().collect()
    }

    /// Discards queued messages and detaches the wake-up callback.
    pub(crate) fn reset(&self) -> usize {
        self.signal.store(None);
        self.queue_rx.try_iter().count()
    }
}

impl Guarded for Application {
    fn lifecycle(&self) -> &LifecycleGuard {
        &self.lifecycle
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("bound", &self.bound)
            .field("queued", &self.queue_rx.len())
            .field("latched", &self.latched_error())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
