//! Ephemeral WAMP id allocation: random 53-bit ids handed out as RAII
//! reservations, generalized from the teacher's `router::random_id()` and
//! grounded on cppwamp's `internal/idgen.hpp` `RandomIdGenerator`/`ReservedId`,
//! see `SPEC_FULL.md` §3.6/§4.5.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::Rng;

/// Upper bound (exclusive) of a legal WAMP id: 2^53.
const ID_CEILING: u64 = 1u64 << 53;

/// A pool of in-use ephemeral ids (session, request, subscription,
/// registration). Uses an internal `Mutex` rather than `RefCell` because a
/// [`crate::session::SessionHandle`] may consult it from a caller that isn't
/// the strand currently driving the owning `Session`, so `IdPool` itself must
/// be `Send + Sync` even though any one `Session` only reserves from it
/// single-threaded.
pub struct IdPool {
    in_use: Arc<Mutex<HashSet<u64>>>,
}

impl IdPool {
    pub fn new() -> IdPool {
        IdPool {
            in_use: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Picks a fresh random id in `[1, 2^53)` absent from the pool, marks it
    /// in use, and returns a handle that releases it back to the pool when
    /// dropped. Collisions are resolved by resampling.
    pub fn reserve(&self) -> ReservedId {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = rng.gen_range(1..ID_CEILING);
            if self.in_use.lock().unwrap().insert(candidate) {
                return ReservedId {
                    id: candidate,
                    pool: Arc::clone(&self.in_use),
                };
            }
        }
    }

    pub fn len(&self) -> usize {
        self.in_use.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdPool {
    fn default() -> IdPool {
        IdPool::new()
    }
}

/// An id reserved from an [`IdPool`]; releases the id back to the pool on
/// drop.
pub struct ReservedId {
    id: u64,
    pool: Arc<Mutex<HashSet<u64>>>,
}

impl ReservedId {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ReservedId {
    fn drop(&mut self) {
        self.pool.lock().unwrap().remove(&self.id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reserved_ids_are_nonzero_and_below_ceiling() {
        let pool = IdPool::new();
        for _ in 0..100 {
            let reserved = pool.reserve();
            assert!(reserved.id() > 0);
            assert!(reserved.id() < ID_CEILING);
        }
    }

    #[test]
    fn dropping_a_reservation_frees_it_for_reuse() {
        let pool = IdPool::new();
        let reserved = pool.reserve();
        assert_eq!(pool.len(), 1);
        drop(reserved);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn concurrently_held_ids_are_distinct() {
        let pool = IdPool::new();
        let a = pool.reserve();
        let b = pool.reserve();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.len(), 2);
    }
}
