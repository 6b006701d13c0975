use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::message::Traffic;

/// Cumulative transmit/receive counters shared by devices and applications.
#[derive(Debug, Default)]
pub struct IoStats {
    rx: Direction,
    tx: Direction,
}

#[derive(Debug, Default)]
struct Direction {
    packets: AtomicU64,
    bytes: AtomicU64,
    data_packets: AtomicU64,
    data_bytes: AtomicU64,
}

impl Direction {
    fn record(&self, traffic: Traffic) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(traffic.bytes, Ordering::Relaxed);
        if let Some(data) = traffic.data_bytes {
            self.data_packets.fetch_add(1, Ordering::Relaxed);
            self.data_bytes.fetch_add(data, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> DirectionSnapshot {
        DirectionSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            data_packets: self.data_packets.load(Ordering::Relaxed),
            data_bytes: self.data_bytes.load(Ordering::Relaxed),
        }
    }
}

impl IoStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rx(&self, traffic: Traffic) {
        self.rx.record(traffic);
    }

    pub fn record_tx(&self, traffic: Traffic) {
        self.tx.record(traffic);
    }

    pub fn snapshot(&self) -> IoStatsSnapshot {
        IoStatsSnapshot {
            rx: self.rx.snapshot(),
            tx: self.tx.snapshot(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IoStatsSnapshot {
    pub rx: DirectionSnapshot,
    pub tx: DirectionSnapshot,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectionSnapshot {
    pub packets: u64,
    pub bytes: u64,
    pub data_packets: u64,
    pub data_bytes: u64,
}
