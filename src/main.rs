mod calc;
mod fault;
mod platform;
mod region;
mod table;
mod validate;

use std::process::ExitCode;

use env_logger::Env;
use log::{error, info};

fn main() -> ExitCode {
    // Use RUST_LOG=debug for per-scenario progress.
    // Example: RUST_LOG=debug ./sqrtmap
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("starting demand-paged square-root table");
    let table = match region::setup() {
        Ok(table) => table,
        Err(err) => {
            error!("setup failed: {err:#}");
            eprintln!("sqrtmap: setup failed: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    info!("table base address: {:#x}", table.base_addr());

    match validate::run(&table) {
        Ok(()) => {
            info!("all validation scenarios passed");
            println!("All tests passed!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("validation failed: {err:#}");
            eprintln!("sqrtmap: validation failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
