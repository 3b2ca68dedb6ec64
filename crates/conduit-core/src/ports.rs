//! Port allocator (C5).
//!
//! A monotonic scan over a reserved range. Allocation is atomic with
//! respect to the Store: the lowest candidate not already recorded as held
//! (by a live session or a running dev server) is additionally verified
//! bindable at the OS level before being handed out, so a port conflict
//! with some unrelated process on the host is caught too.

use std::net::TcpListener;

use conduit_store::Store;

use crate::errors::{CoreError, CoreResult};

/// Scans `[range_start, range_end]` for the lowest port neither held in the
/// Store nor already bound by the OS, and returns it. Does not reserve the
/// port itself — the caller is expected to persist it (as a session's
/// `dev_server_port` or a dev-server instance's `ports`) in the same logical
/// operation, which is what makes the Store-level check in
/// `check_port_available` race-safe for the next allocation.
pub fn allocate_port(store: &Store, range_start: u16, range_end: u16) -> CoreResult<u16> {
    for port in range_start..=range_end {
        if store.is_port_recorded(port as i64)? {
            continue;
        }
        if is_bindable(port) {
            return Ok(port);
        }
    }
    Err(CoreError::Transient(format!(
        "no free port in range {range_start}-{range_end}"
    )))
}

fn is_bindable(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_port_in_range() {
        let store = Store::open_in_memory().unwrap();
        // An empty store holds nothing, so the allocator should return the
        // very first OS-bindable port in a narrow range.
        let port = allocate_port(&store, 20100, 20110).unwrap();
        assert!((20100..=20110).contains(&port));
    }

    #[test]
    fn exhausted_range_is_transient() {
        let store = Store::open_in_memory().unwrap();
        let _hold = TcpListener::bind(("127.0.0.1", 20200)).unwrap();
        let err = allocate_port(&store, 20200, 20200).unwrap_err();
        assert!(matches!(err, CoreError::Transient(_)));
    }
}
