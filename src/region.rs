//! One-shot address-space setup: claims a base address for the table,
//! installs the hard budget, and arms the fault handler.

use anyhow::{ensure, Context, Result};
use log::{debug, info};

use crate::fault;
use crate::platform;
use crate::table::{Table, AS_LIMIT, ELEM_BYTES, MAX_SQRTS, TABLE_BYTES};

/// Performs the setup steps strictly in order. Each step is one-shot and
/// irreversible; any failure means the table cannot exist safely and the
/// error surfaces to `main` for a nonzero exit.
pub fn setup() -> Result<Table> {
    let page = platform::page_size().context("querying platform page size")?;
    ensure!(page.is_power_of_two(), "page size {page} is not a power of two");
    ensure!(
        page % ELEM_BYTES == 0,
        "element size {ELEM_BYTES} does not divide page size {page}"
    );
    debug!("page size is {page} bytes");

    // Claim a span big enough for the whole table plus the budget itself,
    // then give it straight back: the probe must not count against the
    // ceiling, only its base address matters.
    let span = TABLE_BYTES + AS_LIMIT;
    let base =
        platform::reserve_noaccess(span).context("reserving a no-access range for the table")?;
    debug!("table base chosen at {base:#x} ({span} byte probe)");
    platform::release(base, span).context("releasing the probe reservation")?;

    // Only after the probe is gone: finding the span transiently needs far
    // more address space than the budget allows.
    platform::set_address_space_ceiling(AS_LIMIT)
        .context("installing the address-space ceiling")?;

    fault::arm(base, page).context("registering the fault handler")?;
    info!("demand-paged table armed: {MAX_SQRTS} entries at {base:#x}, budget {AS_LIMIT} bytes");
    Ok(Table::new(base))
}
