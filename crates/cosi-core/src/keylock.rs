//! Keyed mutex pool.
//!
//! [`KeyLock`] owns a fixed number of mutexes and selects one by hashing a
//! string key. Equal keys always select the same slot, so every holder of the
//! lock for a given bucket id is serialized. Distinct keys may share a slot and
//! then contend with each other; that costs throughput, not correctness.
//!
//! Waiting for a slot is unbounded. A guard is held across backend calls, so
//! the slots are async mutexes.

use tokio::sync::{Mutex, MutexGuard};

/// FNV-1 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Guard returned by [`KeyLock::lock`]; the slot is released when it is dropped.
pub type KeyGuard<'a> = MutexGuard<'a, ()>;

/// A fixed-size pool of mutexes indexed by key hash.
///
/// # Examples
///
/// ```
/// use cosi_core::KeyLock;
///
/// # tokio_test_block_on(async {
/// let locks = KeyLock::new(100);
/// let guard = locks.lock("ns/secret/bucket-a").await;
/// assert!(locks.try_lock("ns/secret/bucket-a").is_none());
/// drop(guard);
/// assert!(locks.try_lock("ns/secret/bucket-a").is_some());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct KeyLock {
    slots: Box<[Mutex<()>]>,
}

impl KeyLock {
    /// Create a pool with `size` slots. A size of zero is raised to one.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let slots = (0..size.max(1)).map(|_| Mutex::new(())).collect();
        Self { slots }
    }

    /// Wait for and acquire the slot selected by `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        self.slots[slot_for(key, self.slots.len())].lock().await
    }

    /// Acquire the slot selected by `key` if it is free.
    #[must_use]
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard<'_>> {
        self.slots[slot_for(key, self.slots.len())].try_lock().ok()
    }

    /// Number of slots; at least one.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Slot index of `key` in a pool of `size` slots: `fnv1_32(key) mod size`.
///
/// # Examples
///
/// ```
/// use cosi_core::slot_for;
///
/// assert_eq!(slot_for("ns/secret/bucket-a", 100), slot_for("ns/secret/bucket-a", 100));
/// assert!(slot_for("anything", 7) < 7);
/// ```
#[must_use]
pub fn slot_for(key: &str, size: usize) -> usize {
    fnv1_32(key.as_bytes()) as usize % size.max(1)
}

/// 32-bit FNV-1 hash (multiply, then xor).
fn fnv1_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        hash.wrapping_mul(FNV_PRIME) ^ u32::from(*b)
    })
}
