//! Client-side message exchange.

use crate::appl::SignalHandler;
use crate::info::MessageInfo;
use crate::message::Message;
use crate::{ApplId, Capi, DeviceId};

impl Capi {
    /// Hands `msg` to the device addressed by its controller number.
    ///
    /// Never blocks: registry contention and retiring records fail with
    /// `OsResourceError`. `QueueFull` and `Busy` from the driver are passed
    /// through and should be retried once the application is signalled.
    pub fn put_message(&self, appl: ApplId, msg: Message) -> Result<(), MessageInfo> {
        let appl = self.appls.try_acquire(appl)?;
        if let Some(info) = appl.latched_error() {
            return Err(info);
        }

        let (controller, traffic) = {
            let header = msg
                .header()
                .ok_or(MessageInfo::IllegalCommandOrMessageTooSmall)?;
            (header.controller(), header.traffic())
        };
        let device_id = DeviceId::new(u16::from(controller))
            .filter(|id| id.get() <= self.devices.capacity())
            .ok_or(MessageInfo::OsResourceError)?;
        let device = self
            .devices
            .try_acquire(device_id)
            .ok_or(MessageInfo::OsResourceError)?;
        // The id cannot be reused while `device` is held, so a set bit can
        // only belong to this device.
        if !appl.is_bound(device_id) {
            return Err(MessageInfo::OsResourceError);
        }

        device.driver().put_message(&device, appl.target(), msg)?;
        appl.record_tx(traffic);
        device.record_tx(traffic);
        Ok(())
    }

    /// Takes the oldest queued message.
    ///
    /// A latched error is reported in preference to queued messages.
    pub fn get_message(&self, appl: ApplId) -> Result<Message, MessageInfo> {
        let appl = self.appls.acquire(appl)?;
        if let Some(info) = appl.latched_error() {
            return Err(info);
        }
        appl.dequeue().ok_or(MessageInfo::QueueEmpty)
    }

    /// Reports whether [`get_message`](Self::get_message) would succeed now.
    pub fn peek_message(&self, appl: ApplId) -> Result<(), MessageInfo> {
        let appl = self.appls.acquire(appl)?;
        if let Some(info) = appl.latched_error() {
            return Err(info);
        }
        if appl.queue_len() == 0 {
            return Err(MessageInfo::QueueEmpty);
        }
        Ok(())
    }

    /// Installs or clears the application's wake-up callback.
    pub fn set_signal(
        &self,
        appl: ApplId,
        handler: Option<SignalHandler>,
    ) -> Result<(), MessageInfo> {
        let appl = self.appls.acquire(appl)?;
        appl.set_signal(handler);
        Ok(())
    }
}
