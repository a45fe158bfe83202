//! Narrow boundary over the platform's virtual-memory and signal
//! facilities. Everything unsafe about mapping and fault delivery lives
//! here; the layers above are ordinary control flow plus arithmetic.

use std::io;
use std::mem;
use std::ptr;

use libc::{c_int, c_void, siginfo_t};

pub type FaultCallback = extern "C" fn(c_int, *mut siginfo_t, *mut c_void);

pub fn page_size() -> io::Result<usize> {
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if n <= 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// Obtains a no-access private mapping of `len` bytes at a platform-chosen
/// address. The mapping is inaccessible; its only use is claiming the range.
pub fn reserve_noaccess(len: usize) -> io::Result<usize> {
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(addr as usize)
}

pub fn release(addr: usize, len: usize) -> io::Result<()> {
    if unsafe { libc::munmap(addr as *mut c_void, len) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Caps total process virtual memory at `bytes`, soft and hard. Mapping
/// requests past the cap fail with ENOMEM instead of succeeding.
pub fn set_address_space_ceiling(bytes: usize) -> io::Result<()> {
    let lim = libc::rlimit {
        rlim_cur: bytes as libc::rlim_t,
        rlim_max: bytes as libc::rlim_t,
    };
    if unsafe { libc::setrlimit(libc::RLIMIT_AS, &lim) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Maps `len` bytes read-write at exactly `addr`. Fixed placement: the call
/// fails rather than relocating, and a kernel that hands back any other
/// address is treated as a failure too.
pub fn map_fixed_rw(addr: usize, len: usize) -> io::Result<()> {
    let got = unsafe {
        libc::mmap(
            addr as *mut c_void,
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
            -1,
            0,
        )
    };
    if got == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    if got as usize != addr {
        return Err(io::Error::other("kernel relocated a MAP_FIXED mapping"));
    }
    Ok(())
}

/// Registers `callback` for SIGSEGV with SA_SIGINFO so it receives the
/// faulting address. Replaces any previous disposition, including the Rust
/// runtime's stack-overflow handler.
pub fn install_fault_handler(callback: FaultCallback) -> io::Result<()> {
    let mut act: libc::sigaction = unsafe { mem::zeroed() };
    act.sa_sigaction = callback as usize;
    act.sa_flags = libc::SA_SIGINFO;
    unsafe { libc::sigemptyset(&mut act.sa_mask) };
    if unsafe { libc::sigaction(libc::SIGSEGV, &act, ptr::null_mut()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Restores the default SIGSEGV disposition. Async-signal-safe; called from
/// inside the handler when a fault is not ours to resolve.
pub fn reset_fault_handler() {
    let mut act: libc::sigaction = unsafe { mem::zeroed() };
    act.sa_sigaction = libc::SIG_DFL;
    unsafe {
        libc::sigemptyset(&mut act.sa_mask);
        libc::sigaction(libc::SIGSEGV, &act, ptr::null_mut());
    }
}
