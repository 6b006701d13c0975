use std::fmt::Write;

use capi_core::Capi;

const APPLPARAMS_HEADER: &str = "ID   : LogConns DataPackets DataLen\n";
const APPLSTATS_HEADER: &str = "ID   : txPackets txBytes txDataPackets txDataBytes | rxPackets rxBytes rxDataPackets rxDataBytes rxQueue\n";

/// Registration parameters of every application, in registration order.
pub fn applparams(capi: &Capi) -> String {
    let mut out = String::from(APPLPARAMS_HEADER);
    for appl in capi.appl_snapshots() {
        let _ = writeln!(
            out,
            "{:<5}: {:<8} {:<11} {:<7}",
            appl.id,
            appl.params.level3_connections,
            appl.params.data_blocks,
            appl.params.data_block_len
        );
    }
    out
}

/// Cumulative I/O counters and queue depth of every application.
pub fn applstats(capi: &Capi) -> String {
    let mut out = String::from(APPLSTATS_HEADER);
    for appl in capi.appl_snapshots() {
        let (tx, rx) = (appl.stats.tx, appl.stats.rx);
        let _ = writeln!(
            out,
            "{:<5}: {:<9} {:<7} {:<13} {:<11} | {:<9} {:<7} {:<13} {:<11} {:<7}",
            appl.id,
            tx.packets,
            tx.bytes,
            tx.data_packets,
            tx.data_bytes,
            rx.packets,
            rx.bytes,
            rx.data_packets,
            rx.data_bytes,
            appl.queue_depth
        );
    }
    out
}
