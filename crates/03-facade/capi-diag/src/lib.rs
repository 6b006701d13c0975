//! Presentation views over a [`Capi`] registry.
//!
//! * [`device_attributes`] – per-device key/value attributes.
//! * [`applparams`] / [`applstats`] – fixed-width per-application tables.
//! * [`ndjson`] – one JSON object per device and application.

mod attributes;
mod tables;

use capi_core::{ApplSnapshot, Capi, DeviceSnapshot};
use serde::Serialize;

pub use attributes::{device_attributes, Attribute};
pub use tables::{applparams, applstats};

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Device(&'a DeviceSnapshot),
    Application(&'a ApplSnapshot),
}

/// Serializes every device, then every application, one JSON object per line.
pub fn ndjson(capi: &Capi) -> serde_json::Result<String> {
    let devices = capi.device_snapshots();
    let appls = capi.appl_snapshots();
    let records = devices
        .iter()
        .map(Record::Device)
        .chain(appls.iter().map(Record::Application));

    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(&record)?);
        out.push('\n');
    }
    Ok(out)
}
