//! Table geometry: compile-time constants, the consumer handle, and the
//! address/index arithmetic shared by setup and the fault handler.

use std::ptr;

/// Number of f64 entries the table covers.
pub const MAX_SQRTS: usize = 1 << 27;

/// Hard ceiling on total mapped virtual memory for the process, in bytes.
/// Must leave room for the process's own fixed mappings plus exactly one
/// resident chunk.
pub const AS_LIMIT: usize = 1 << 26;

/// Bytes per table element.
pub const ELEM_BYTES: usize = std::mem::size_of::<f64>();

/// Full span of the table's address range, in bytes.
pub const TABLE_BYTES: usize = MAX_SQRTS * ELEM_BYTES;

/// Rounds `value` down to a multiple of `alignment` (a power of two).
pub fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Table-index range covered by the chunk starting at `chunk_base`:
/// `(start_index, count)`. `chunk_base` must be page-aligned and inside the
/// table, and `ELEM_BYTES` must divide `page_size` (checked at setup).
pub fn chunk_span(chunk_base: usize, table_base: usize, page_size: usize) -> (usize, usize) {
    debug_assert!(chunk_base >= table_base);
    ((chunk_base - table_base) / ELEM_BYTES, page_size / ELEM_BYTES)
}

/// Consumer view of the demand-paged table. Element `i` lives at
/// `base + i * ELEM_BYTES`; whether the memory behind it is resident is
/// invisible to the caller.
pub struct Table {
    base: *const f64,
}

impl Table {
    pub fn new(base: usize) -> Self {
        Self {
            base: base as *const f64,
        }
    }

    pub fn base_addr(&self) -> usize {
        self.base as usize
    }

    /// Reads element `index`. The load is volatile so the compiler emits a
    /// real, restartable load for every access: it either hits resident
    /// memory or faults into the handler and is retried by the kernel.
    pub fn get(&self, index: usize) -> f64 {
        assert!(index < MAX_SQRTS, "table index {index} out of domain");
        unsafe { ptr::read_volatile(self.base.add(index)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_is_identity_on_aligned_values() {
        assert_eq!(align_down(0, 0x1000), 0);
        assert_eq!(align_down(0x4000, 0x1000), 0x4000);
    }

    #[test]
    fn align_down_rounds_to_page_start() {
        assert_eq!(align_down(0x4001, 0x1000), 0x4000);
        assert_eq!(align_down(0x4fff, 0x1000), 0x4000);
        assert_eq!(align_down(0x5000, 0x1000), 0x5000);
    }

    #[test]
    fn chunk_span_of_first_chunk_starts_at_zero() {
        let (start, count) = chunk_span(0x7000_0000, 0x7000_0000, 4096);
        assert_eq!(start, 0);
        assert_eq!(count, 4096 / ELEM_BYTES);
    }

    #[test]
    fn chunk_span_of_interior_chunk() {
        let base = 0x7000_0000;
        let (start, count) = chunk_span(base + 3 * 4096, base, 4096);
        assert_eq!(start, 3 * (4096 / ELEM_BYTES));
        assert_eq!(count, 512);
    }

    #[test]
    fn element_size_divides_common_page_sizes() {
        for page in [4096usize, 16384, 65536] {
            assert_eq!(page % ELEM_BYTES, 0);
        }
    }

    #[test]
    fn table_dwarfs_the_budget() {
        assert!(TABLE_BYTES > AS_LIMIT);
        assert!(AS_LIMIT > 64 * 1024);
    }
}
