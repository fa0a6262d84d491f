use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// 2025-01-01T00:00:00Z
const EPOCH: u64 = 1_735_689_600_000;
const SEQUENCE_BITS: u32 = 22;

/// Last id handed out. Each new id is `max(last + 1, now << 22)`, so ids are
/// unique and increasing even when many are taken within one millisecond.
static LAST: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH)
}

pub fn generate() -> String {
    let floor = now_ms().saturating_sub(EPOCH) << SEQUENCE_BITS;
    let prev = LAST
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(floor.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    floor.max(prev + 1).to_string()
}

pub fn timestamp_of(id: &str) -> Option<u64> {
    let num: u64 = id.parse().ok()?;
    Some((num >> SEQUENCE_BITS) + EPOCH)
}
