//! Exercises the table under sequential, thrashing, and mixed random access
//! and cross-checks every value against the calculator.

use anyhow::{bail, ensure, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calc;
use crate::fault;
use crate::platform;
use crate::table::{Table, AS_LIMIT, ELEM_BYTES, MAX_SQRTS};

const MIXED_READS: usize = 500_000;
const RNG_SEED: u64 = 0xDEAD_BEEF;

pub fn run(table: &Table) -> Result<()> {
    let page = platform::page_size()?;
    let per_chunk = page / ELEM_BYTES;

    spot_checks(table)?;
    sequential_chunk(table, per_chunk)?;
    thrash(table, per_chunk)?;
    mixed_sweep(table, page)?;
    budget_enforcement()?;
    Ok(())
}

fn check(table: &Table, index: usize) -> Result<()> {
    let expected = calc::sqrt_at(index);
    let actual = table.get(index);
    if actual.to_bits() != expected.to_bits() {
        bail!("value mismatch at index {index}: expected {expected}, got {actual}");
    }
    Ok(())
}

fn spot_checks(table: &Table) -> Result<()> {
    ensure!(table.get(0) == 0.0, "index 0 should read exactly 0.0");
    ensure!(table.get(4) == 2.0, "index 4 should read exactly 2.0");
    info!("spot checks passed");
    Ok(())
}

fn sequential_chunk(table: &Table, per_chunk: usize) -> Result<()> {
    // A chunk nothing has touched yet, so the first read is a miss.
    let start = per_chunk * 3;
    let before = fault::fault_count();
    for i in start..start + per_chunk {
        check(table, i)?;
    }
    let faults = fault::fault_count() - before;
    ensure!(
        faults == 1,
        "sequential scan of one chunk took {faults} faults, expected 1"
    );
    info!("sequential chunk scan: 1 fault for {per_chunk} reads");
    Ok(())
}

fn thrash(table: &Table, per_chunk: usize) -> Result<()> {
    // Reading 0, a far index, then 0 again must evict twice: three misses.
    let far = per_chunk * 1000;
    let before = fault::fault_count();
    check(table, 0)?;
    check(table, far)?;
    check(table, 0)?;
    let faults = fault::fault_count() - before;
    ensure!(
        faults == 3,
        "evict/re-fault sequence took {faults} faults, expected 3"
    );
    info!("single-slot eviction confirmed: 3 faults for 0 -> {far} -> 0");
    Ok(())
}

fn mixed_sweep(table: &Table, page: usize) -> Result<()> {
    info!("validating {MIXED_READS} mixed random/sequential reads");
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let mut pos = rng.random_range(0..MAX_SQRTS - 1);
    for i in 0..MIXED_READS {
        if i % 2 == 0 {
            pos = rng.random_range(0..MAX_SQRTS - 1);
        } else {
            pos += 1;
        }
        check(table, pos)?;
        if i % 50_000 == 0 {
            let resident = fault::resident_bytes();
            ensure!(
                resident <= page,
                "resident chunk memory is {resident} bytes, exceeds one page ({page})"
            );
            debug!("{i} reads validated, {} faults so far", fault::fault_count());
        }
    }
    info!("mixed sweep passed, {} faults total", fault::fault_count());
    Ok(())
}

fn budget_enforcement() -> Result<()> {
    // With the ceiling installed, a reservation the size of the whole
    // budget cannot fit on top of the running process and must be refused.
    match platform::reserve_noaccess(AS_LIMIT) {
        Err(e) => {
            info!("oversized reservation refused as expected: {e}");
            Ok(())
        }
        Ok(addr) => {
            let _ = platform::release(addr, AS_LIMIT);
            bail!("a {AS_LIMIT}-byte reservation succeeded despite the address-space ceiling");
        }
    }
}
