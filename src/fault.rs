//! The access-violation handler. On each table miss it evicts the
//! previously resident chunk, maps fresh read-write memory at the faulting
//! chunk's aligned base, and fills it with computed values before the
//! kernel retries the faulting access.

use std::io;
use std::slice;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use libc::{c_int, c_void, siginfo_t};

use crate::calc;
use crate::platform;
use crate::table::{self, TABLE_BYTES};

// Published once by `arm` before the handler can run; read-only afterward.
static TABLE_BASE: AtomicUsize = AtomicUsize::new(0);
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

// At most one chunk is resident at any instant; 0 means the slot is empty.
// The handler is the slot's only mutator (single thread, and the kernel
// blocks re-delivery of SIGSEGV while the handler runs).
static RESIDENT: AtomicUsize = AtomicUsize::new(0);

static FAULT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Publishes the table geometry and registers the SIGSEGV handler.
pub fn arm(table_base: usize, page_size: usize) -> io::Result<()> {
    TABLE_BASE.store(table_base, Ordering::Relaxed);
    PAGE_SIZE.store(page_size, Ordering::Relaxed);
    platform::install_fault_handler(on_fault)
}

/// Number of table misses handled so far.
pub fn fault_count() -> u64 {
    FAULT_COUNT.load(Ordering::Relaxed)
}

/// Bytes of table memory currently resident: one page or zero.
pub fn resident_bytes() -> usize {
    if RESIDENT.load(Ordering::Relaxed) != 0 {
        PAGE_SIZE.load(Ordering::Relaxed)
    } else {
        0
    }
}

extern "C" fn on_fault(_signo: c_int, info: *mut siginfo_t, _ctx: *mut c_void) {
    let fault_addr = unsafe { (*info).si_addr() } as usize;
    let base = TABLE_BASE.load(Ordering::Relaxed);
    let page = PAGE_SIZE.load(Ordering::Relaxed);

    // A fault outside the table's range is not a table miss. Fall back to
    // the default disposition and return; the retried access then kills the
    // process the normal way instead of being mistaken for a chunk miss.
    if base == 0 || fault_addr < base || fault_addr >= base + TABLE_BYTES {
        platform::reset_fault_handler();
        return;
    }

    FAULT_COUNT.fetch_add(1, Ordering::Relaxed);

    // Evict before mapping: the address-space budget has room for exactly
    // one resident chunk.
    let old = RESIDENT.swap(0, Ordering::Relaxed);
    if old != 0 {
        if let Err(e) = platform::release(old, page) {
            die(
                "sqrtmap: failed to unmap resident chunk",
                e.raw_os_error().unwrap_or(0),
            );
        }
    }

    let chunk = table::align_down(fault_addr, page);
    if let Err(e) = platform::map_fixed_rw(chunk, page) {
        die(
            "sqrtmap: failed to map chunk at fixed address",
            e.raw_os_error().unwrap_or(0),
        );
    }
    RESIDENT.store(chunk, Ordering::Relaxed);

    let (start, count) = table::chunk_span(chunk, base, page);
    let out = unsafe { slice::from_raw_parts_mut(chunk as *mut f64, count) };
    calc::fill(start, out);
}

// Unrecoverable error inside the handler: no way to resume the faulting
// instruction without backing memory. Only async-signal-safe calls here,
// so write(2) the message plus errno and _exit(2).
fn die(msg: &str, errno: i32) -> ! {
    let mut buf = [0u8; 32];
    let tail = format_errno(errno, &mut buf);
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::write(libc::STDERR_FILENO, tail.as_ptr().cast(), tail.len());
        libc::_exit(1)
    }
}

// Renders " (errno N)\n" without allocating.
fn format_errno(errno: i32, buf: &mut [u8; 32]) -> &[u8] {
    const PREFIX: &[u8] = b" (errno ";
    buf[..PREFIX.len()].copy_from_slice(PREFIX);
    let mut n = PREFIX.len();
    if errno < 0 {
        buf[n] = b'-';
        n += 1;
    }
    let mut digits = [0u8; 10];
    let mut v = errno.unsigned_abs();
    let mut d = 0;
    loop {
        digits[d] = b'0' + (v % 10) as u8;
        v /= 10;
        d += 1;
        if v == 0 {
            break;
        }
    }
    while d > 0 {
        d -= 1;
        buf[n] = digits[d];
        n += 1;
    }
    buf[n] = b')';
    buf[n + 1] = b'\n';
    &buf[..n + 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_rendering() {
        let mut buf = [0u8; 32];
        assert_eq!(format_errno(12, &mut buf), b" (errno 12)\n");
        let mut buf = [0u8; 32];
        assert_eq!(format_errno(0, &mut buf), b" (errno 0)\n");
        let mut buf = [0u8; 32];
        assert_eq!(format_errno(-3, &mut buf), b" (errno -3)\n");
    }
}
