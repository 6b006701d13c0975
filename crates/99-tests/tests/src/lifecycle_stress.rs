//! Concurrent churn of devices and applications against a stable pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use capi_core::{Capi, MessageInfo};

use crate::mock::{data_ind, device_info, params, request, Call, MockDriver};

const ROUNDS: usize = 150;
const DEVICE_WORKERS: usize = 2;
const APPL_WORKERS: usize = 3;

fn count(calls: &[Call], pick: fn(&Call) -> bool) -> usize {
    calls.iter().filter(|call| pick(call)).count()
}

#[test]
fn churn_settles_to_consistent_bindings() {
    let _ = env_logger::builder().is_test(true).try_init();
    let capi = Capi::default();
    let stable = MockDriver::shared();
    let stable_dev = capi
        .register_device(device_info("stable"), stable.clone())
        .expect("install");
    let stable_appl = capi.register(params(2048)).expect("register");
    let stop = AtomicBool::new(false);

    let churned: Vec<Arc<MockDriver>> = thread::scope(|s| {
        let pump = s.spawn(|| {
            let device = capi.device(stable_dev).expect("stable device");
            let mut received = 0usize;
            loop {
                let _ = capi.put_message(stable_appl, request(stable_appl, stable_dev.get() as u8));
                stable.deliver(&device, stable_appl.get(), data_ind(stable_appl, 1, 1, b"x"));
                while capi.get_message(stable_appl).is_ok() {
                    received += 1;
                }
                if stop.load(Ordering::Acquire) {
                    break received;
                }
            }
        });

        let device_workers: Vec<_> = (0..DEVICE_WORKERS)
            .map(|worker| {
                let capi = &capi;
                s.spawn(move || {
                    let mut drivers = Vec::with_capacity(ROUNDS);
                    for _ in 0..ROUNDS {
                        let driver = MockDriver::shared();
                        let id = capi
                            .register_device(device_info(&format!("churn-{worker}")), driver.clone())
                            .expect("install");
                        thread::yield_now();
                        capi.unregister_device(id).expect("installed");
                        driver.mark_unregistered();
                        drivers.push(driver);
                    }
                    drivers
                })
            })
            .collect();

        let appl_workers: Vec<_> = (0..APPL_WORKERS)
            .map(|_| {
                let capi = &capi;
                s.spawn(move || {
                    for _ in 0..ROUNDS {
                        let appl = capi.register(params(1024)).expect("register");
                        let bound = capi.application(appl).expect("registered").bound_devices();
                        for dev in bound {
                            match capi.put_message(appl, request(appl, dev.get() as u8)) {
                                Ok(()) | Err(MessageInfo::OsResourceError) => {}
                                Err(other) => panic!("unexpected put_message failure: {other}"),
                            }
                        }
                        assert_eq!(capi.release(appl), Ok(None));
                    }
                })
            })
            .collect();

        for worker in appl_workers {
            worker.join().expect("application worker");
        }
        let drivers: Vec<_> = device_workers
            .into_iter()
            .flat_map(|worker| worker.join().expect("device worker"))
            .collect();
        stop.store(true, Ordering::Release);
        assert!(pump.join().expect("pump") > 0);
        drivers
    });

    for driver in &churned {
        assert_eq!(driver.late_calls(), 0, "driver called after unregister returned");
        let calls = driver.calls();
        assert!(
            count(&calls, |c| matches!(c, Call::Release(_)))
                <= count(&calls, |c| matches!(c, Call::Register(_)))
        );
    }

    // The stable device saw every churned application come and go.
    let calls = stable.calls();
    let churn = APPL_WORKERS * ROUNDS;
    assert_eq!(count(&calls, |c| matches!(c, Call::Register(_))), churn + 1);
    assert_eq!(count(&calls, |c| matches!(c, Call::Release(_))), churn);

    let devices = capi.device_snapshots();
    let appls = capi.appl_snapshots();
    assert_eq!(devices.len(), 1);
    assert_eq!(appls.len(), 1);
    for device in &devices {
        let bound = appls
            .iter()
            .filter(|appl| appl.bound.contains(&device.id))
            .count();
        assert_eq!(device.refs as usize, bound + 1);
    }
    assert_eq!(appls[0].bound, vec![stable_dev]);
}

#[test]
fn concurrent_registrations_never_miss_each_other() {
    for _ in 0..50 {
        let capi = Capi::default();
        let driver = MockDriver::shared();
        let (dev, appl) = thread::scope(|s| {
            let dev = s.spawn(|| {
                capi.register_device(device_info("racer"), driver.clone())
                    .expect("install")
            });
            let appl = s.spawn(|| capi.register(params(2048)).expect("register"));
            (
                dev.join().expect("device"),
                appl.join().expect("application"),
            )
        });

        assert!(capi.application(appl).expect("registered").is_bound(dev));
        assert_eq!(driver.calls(), vec![Call::Register(appl.get())]);
        assert_eq!(capi.device(dev).expect("installed").refs(), 2);
    }
}

#[test]
fn put_never_reaches_a_device_that_refused_the_application() {
    let capi = Capi::default();
    let appl = capi.register(params(2048)).expect("register");
    let stop = AtomicBool::new(false);

    let refusing: Vec<Arc<MockDriver>> = thread::scope(|s| {
        let sender = s.spawn(|| {
            let mut routed = 0usize;
            while !stop.load(Ordering::Acquire) {
                if capi.put_message(appl, request(appl, 1)).is_ok() {
                    routed += 1;
                }
            }
            routed
        });

        let mut refusing = Vec::new();
        for round in 0..ROUNDS * 4 {
            let driver = if round % 2 == 0 {
                MockDriver::shared()
            } else {
                MockDriver::refusing([appl.get()])
            };
            let id = capi
                .register_device(device_info("alternating"), driver.clone())
                .expect("install");
            assert_eq!(id.get(), 1);
            thread::yield_now();
            capi.unregister_device(id).expect("installed");
            if round % 2 == 1 {
                refusing.push(driver);
            }
        }
        stop.store(true, Ordering::Release);
        sender.join().expect("sender");
        refusing
    });

    for driver in &refusing {
        assert!(
            !driver.calls().contains(&Call::Put(appl.get())),
            "message routed to a device the application is not bound to"
        );
    }
}
