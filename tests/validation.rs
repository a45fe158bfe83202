//! End-to-end run of the demand-paged table binary. The fault handler, the
//! address-space ceiling, and the SIGSEGV disposition are process-global,
//! so the mechanism gets its own process instead of the threaded test
//! harness.

use std::process::Command;

#[test]
fn full_validation_run_passes() {
    let output = Command::new(env!("CARGO_BIN_EXE_sqrtmap"))
        .output()
        .expect("failed to spawn sqrtmap binary");

    assert!(
        output.status.success(),
        "sqrtmap exited with {:?}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("All tests passed!"),
        "missing success line in stdout: {stdout}"
    );
}
