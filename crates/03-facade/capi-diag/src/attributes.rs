use capi_core::{Capi, DeviceId};

/// One read-only device attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Path relative to the device, e.g. `statistics/rx_bytes`.
    pub name: &'static str,
    pub value: String,
}

impl Attribute {
    fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

/// Identity and counter attributes of an installed device.
pub fn device_attributes(capi: &Capi, id: DeviceId) -> Option<Vec<Attribute>> {
    let device = capi.device(id)?;
    let info = device.info();
    let stats = device.stats();
    Some(vec![
        Attribute::new("manufacturer", &info.manufacturer),
        Attribute::new("serial_number", &info.serial),
        Attribute::new(
            "version",
            format!("{}.{}", info.version.manu_major, info.version.manu_minor),
        ),
        Attribute::new("product", &info.product),
        Attribute::new("statistics/rx_bytes", stats.rx.bytes),
        Attribute::new("statistics/tx_bytes", stats.tx.bytes),
        Attribute::new("statistics/rx_packets", stats.rx.packets),
        Attribute::new("statistics/tx_packets", stats.tx.packets),
    ])
}
