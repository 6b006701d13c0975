//! Cross-registration of devices and applications.
//!
//! Walks hold the table lock only long enough to step the cursor; driver
//! callbacks always run with no registry lock held.

use std::sync::Arc;

use capi_sync::{Cursor, GuardRef};
use tracing::{debug, warn};

use crate::appl::Application;
use crate::appl_registry::ApplRegistry;
use crate::device::Device;
use crate::device_registry::DeviceRegistry;

/// Outcome of one bind attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindOutcome {
    Bound,
    /// The driver refused; the pair stays unbound.
    Refused,
    /// One side is retiring, or the pair is already bound or being bound.
    Skipped,
}

/// Registers `device` with every live application, in registration order.
pub(crate) fn bind_device_to_all_appls(device: &Arc<Device>, appls: &ApplRegistry) -> usize {
    let mut cursor = Cursor::START;
    let mut bound = 0;
    while let Some((next, appl)) = appls.next_after(cursor) {
        cursor = next;
        if bind(device, &appl) == BindOutcome::Bound {
            bound += 1;
        }
    }
    bound
}

/// Registers `appl` with every active device, in installation order.
pub(crate) fn bind_appl_to_all_devices(appl: &Arc<Application>, devices: &DeviceRegistry) -> usize {
    let mut cursor = Cursor::START;
    let mut bound = 0;
    while let Some((next, device)) = devices.next_after(cursor) {
        cursor = next;
        if bind(&device, appl) == BindOutcome::Bound {
            bound += 1;
        }
    }
    bound
}

/// Runs the register callback for one pair and records the binding.
///
/// Both records stay referenced for the duration of the callback, so neither
/// teardown can complete underneath it.
pub(crate) fn bind(device: &Arc<Device>, appl: &Arc<Application>) -> BindOutcome {
    let Some(device_ref) = GuardRef::try_acquire(device) else {
        return BindOutcome::Skipped;
    };
    let Some(_appl_ref) = GuardRef::try_acquire(appl) else {
        return BindOutcome::Skipped;
    };
    if !appl.claim(device.id()) {
        return BindOutcome::Skipped;
    }

    match device.driver().register(device, appl) {
        Ok(()) => match appl.commit(device_ref) {
            Ok(()) => {
                debug!(device = %device.id(), appl = %appl.id(), "bound");
                BindOutcome::Bound
            }
            Err(_retiring) => {
                debug!(
                    device = %device.id(),
                    appl = %appl.id(),
                    "device retired during register; not bound"
                );
                BindOutcome::Skipped
            }
        },
        Err(info) => {
            appl.abandon(device.id());
            warn!(
                device = %device.id(),
                appl = %appl.id(),
                info = info.code(),
                "register failed: {info}"
            );
            BindOutcome::Refused
        }
    }
}
