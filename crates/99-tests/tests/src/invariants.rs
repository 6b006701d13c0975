//! Property checks of the binding, queue and latch invariants.

use std::collections::VecDeque;
use std::sync::Arc;

use capi_core::{ApplId, Capi, CoreConfig, DeviceId, Message, MessageInfo};
use proptest::collection;
use proptest::prelude::*;
use proptest::sample::Index;

use crate::mock::{data_ind, device_info, params, MockDriver};

#[derive(Clone, Debug)]
enum Op {
    /// `picky` devices refuse odd application ids.
    AddDevice { picky: bool },
    RemoveDevice(Index),
    AddAppl,
    ReleaseAppl(Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|picky| Op::AddDevice { picky }),
        any::<Index>().prop_map(Op::RemoveDevice),
        Just(Op::AddAppl),
        any::<Index>().prop_map(Op::ReleaseAppl),
    ]
}

struct LiveDevice {
    id: DeviceId,
    picky: bool,
}

impl LiveDevice {
    fn accepts(&self, appl: ApplId) -> bool {
        !self.picky || appl.get() % 2 == 0
    }
}

fn lowest_free(used: impl Iterator<Item = u16>) -> u16 {
    let mut used: Vec<u16> = used.collect();
    used.sort_unstable();
    let mut candidate = 1;
    for id in used {
        if id == candidate {
            candidate += 1;
        }
    }
    candidate
}

fn check(capi: &Capi, devices: &[LiveDevice], appls: &[ApplId]) -> Result<(), TestCaseError> {
    for &appl in appls {
        let mut expected: Vec<DeviceId> = devices
            .iter()
            .filter(|dev| dev.accepts(appl))
            .map(|dev| dev.id)
            .collect();
        expected.sort_unstable();
        let app = capi.application(appl).expect("live application");
        prop_assert_eq!(app.bound_devices().into_vec(), expected);
    }
    for dev in devices {
        let bound = appls.iter().filter(|appl| dev.accepts(**appl)).count();
        let device = capi.device(dev.id).expect("live device");
        prop_assert_eq!(device.refs() as usize, bound + 1);
    }
    prop_assert_eq!(capi.device_snapshots().len(), devices.len());
    prop_assert_eq!(capi.appl_snapshots().len(), appls.len());
    Ok(())
}

fn odd_ids() -> impl Iterator<Item = u16> {
    (1..=64).filter(|id| id % 2 == 1)
}

proptest! {
    /// Every live pair the driver accepted is bound, and each device holds one
    /// reference per binding plus its owner.
    #[test]
    fn bindings_track_registrations(ops in collection::vec(op(), 1..60)) {
        let capi = Capi::new(CoreConfig { max_devices: 8, max_applications: 16 })
            .expect("valid config");
        let mut devices: Vec<LiveDevice> = Vec::new();
        let mut appls: Vec<ApplId> = Vec::new();

        for op in ops {
            match op {
                Op::AddDevice { picky } => {
                    let driver = if picky { MockDriver::refusing(odd_ids()) } else { MockDriver::shared() };
                    let expected = lowest_free(devices.iter().map(|dev| dev.id.get()));
                    match capi.register_device(device_info("prop"), driver) {
                        Ok(id) => {
                            prop_assert_eq!(id.get(), expected);
                            devices.push(LiveDevice { id, picky });
                        }
                        Err(err) => prop_assert_eq!(devices.len(), 8, "unexpected {}", err),
                    }
                }
                Op::RemoveDevice(idx) => {
                    if devices.is_empty() {
                        continue;
                    }
                    let dev = devices.remove(idx.index(devices.len()));
                    prop_assert!(capi.unregister_device(dev.id).is_ok());
                    prop_assert!(capi.device(dev.id).is_none());
                }
                Op::AddAppl => {
                    let expected = lowest_free(appls.iter().map(|appl| appl.get()));
                    match capi.register(params(2048)) {
                        Ok(id) => {
                            prop_assert_eq!(id.get(), expected);
                            appls.push(id);
                        }
                        Err(info) => {
                            prop_assert_eq!(appls.len(), 16);
                            prop_assert_eq!(info, capi_core::RegisterInfo::TooManyApplications);
                        }
                    }
                }
                Op::ReleaseAppl(idx) => {
                    if appls.is_empty() {
                        continue;
                    }
                    let appl = appls.remove(idx.index(appls.len()));
                    prop_assert_eq!(capi.release(appl), Ok(None));
                    prop_assert_eq!(capi.release(appl), Err(MessageInfo::IllegalApplication));
                }
            }
            check(&capi, &devices, &appls)?;
        }
    }

    /// Interleaved enqueue and get behave like a FIFO queue.
    #[test]
    fn queue_is_fifo(steps in collection::vec(any::<bool>(), 1..200)) {
        let capi = Capi::default();
        let appl = capi.register(params(2048)).expect("register");
        let app = capi.application(appl).expect("registered");
        let mut model: VecDeque<u16> = VecDeque::new();
        let mut next = 0u16;

        for enqueue in steps {
            if enqueue {
                app.enqueue(data_ind(appl, 1, next, &[0u8; 3]));
                model.push_back(next);
                next = next.wrapping_add(1);
            } else {
                let got: Result<Message, MessageInfo> = capi.get_message(appl);
                match model.pop_front() {
                    Some(number) => {
                        let msg = got.expect("queued message");
                        prop_assert_eq!(msg.header().map(|h| h.number()), Some(number));
                    }
                    None => prop_assert_eq!(got.err(), Some(MessageInfo::QueueEmpty)),
                }
            }
            prop_assert_eq!(app.queue_len(), model.len());
            let peek = capi.peek_message(appl);
            prop_assert_eq!(peek.is_ok(), !model.is_empty());
        }
    }

    /// Only the first signalled error is latched.
    #[test]
    fn first_error_wins(codes in collection::vec(0x1101u16..=0x110b, 1..20)) {
        let capi = Capi::default();
        let appl = capi.register(params(2048)).expect("register");
        let app: Arc<_> = capi.application(appl).expect("registered");
        let infos: Vec<MessageInfo> = codes.into_iter().filter_map(MessageInfo::from_code).collect();
        prop_assume!(!infos.is_empty());

        for info in &infos {
            app.signal_error(*info);
        }
        prop_assert_eq!(app.latched_error(), Some(infos[0]));
        prop_assert_eq!(capi.get_message(appl).err(), Some(infos[0]));
        prop_assert_eq!(capi.release(appl), Ok(Some(infos[0])));
    }
}
