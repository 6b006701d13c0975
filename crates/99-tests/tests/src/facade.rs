//! The compatibility table and diagnostic views driven through a live core.

use std::sync::Arc;

use anyhow::{ensure, Context};
use capi_compat::{InterfaceUser, KernelCapi, DEVADD, DEVREMOVE};
use capi_core::{Capi, MessageInfo};
use capi_diag::{applparams, applstats, device_attributes, ndjson};
use parking_lot::Mutex;

use crate::mock::{data_ind, device_info, params, request, MockDriver};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn traffic_through_compat_shows_up_in_diag_views() {
    init_logging();
    let core = Arc::new(Capi::default());
    let capi = KernelCapi::new(Arc::clone(&core));
    let driver = MockDriver::shared();
    let dev = core
        .register_device(device_info("d1"), driver.clone())
        .expect("install");

    let applid = capi.register(&params(2048)).expect("register");
    let appl = capi_core::ApplId::new(applid).expect("non-zero");
    assert_eq!(capi.put_message(applid, request(appl, dev.get() as u8)), 0);
    let device = core.device(dev).expect("installed");
    assert!(driver.deliver(&device, applid, data_ind(appl, 1, 1, b"hello")));
    let msg = capi.get_message(applid).expect("queued");
    assert_eq!(msg.len(), 27);
    assert_eq!(
        capi.get_message(applid).err(),
        Some(MessageInfo::QueueEmpty.code())
    );

    let attrs = device_attributes(&core, dev).expect("installed");
    let value = |name: &str| {
        attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    };
    assert_eq!(value("manufacturer"), Some("mock"));
    assert_eq!(value("serial_number"), Some("0001"));
    assert_eq!(value("version"), Some("3.7"));
    assert_eq!(value("product"), Some("d1"));
    assert_eq!(value("statistics/tx_packets"), Some("1"));
    assert_eq!(value("statistics/tx_bytes"), Some("12"));
    assert_eq!(value("statistics/rx_packets"), Some("1"));
    assert_eq!(value("statistics/rx_bytes"), Some("27"));

    assert_eq!(
        applstats(&core).lines().nth(1),
        Some("1    : 1         12      0             0           | 1         27      1             5           0      ")
    );
    assert_eq!(applparams(&core).lines().count(), 2);

    assert_eq!(capi.release(applid), 0);
    assert_eq!(capi.release(applid), MessageInfo::IllegalApplication.code());
    assert!(device_attributes(&core, dev).is_some());
    core.unregister_device(dev).expect("installed");
    assert!(device_attributes(&core, dev).is_none());
}

#[test]
fn interface_users_see_controller_events() {
    init_logging();
    let core = Arc::new(Capi::default());
    let capi = KernelCapi::new(Arc::clone(&core));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    capi.attach(InterfaceUser::new("recorder", move |cmd, controller, profile| {
        sink.lock()
            .push((cmd, controller, profile.map(|p| p.ncontroller)));
    }));

    let dev = core
        .register_device(device_info("d1"), MockDriver::shared())
        .expect("install");
    core.unregister_device(dev).expect("installed");
    assert!(capi.detach("recorder"));
    let again = core
        .register_device(device_info("d2"), MockDriver::shared())
        .expect("install");

    let controller = u32::from(dev.get());
    assert_eq!(
        *events.lock(),
        vec![(DEVADD, controller, Some(1)), (DEVREMOVE, controller, None)]
    );
    assert_eq!(again, dev);
    assert_eq!(capi.is_installed(), 0);
    assert_eq!(capi.get_manufacturer(u32::from(again.get())), Ok("mock".to_owned()));
    assert_eq!(capi.get_product(u32::from(again.get())), Ok("d2".to_owned()));
    assert_eq!(
        capi.get_serial(u32::MAX),
        Err(MessageInfo::OsResourceError.code())
    );
}

#[test]
fn ndjson_lists_devices_then_applications() -> anyhow::Result<()> {
    let core = Capi::default();
    core.register_device(device_info("d1"), MockDriver::shared())?;
    core.register_device(device_info("d2"), MockDriver::refusing([2]))?;
    core.register(params(2048))?;
    core.register(params(4096))?;

    let text = ndjson(&core)?;
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .context("each line is one JSON object")?;
    let kinds: Vec<&str> = records
        .iter()
        .filter_map(|record| record["kind"].as_str())
        .collect();
    ensure!(
        kinds == ["device", "device", "application", "application"],
        "unexpected record order {kinds:?}"
    );
    ensure!(records[0]["refs"] == 3, "d1 is bound to both applications");
    ensure!(records[1]["refs"] == 2, "d2 refused application 2");
    ensure!(records[3]["bound"] == serde_json::json!([1]));
    Ok(())
}
