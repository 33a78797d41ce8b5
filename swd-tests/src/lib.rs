//! Shared setup for the integration tests of the SWD crates.
use env_logger::Env;
use swd_client::{Builder, SwdClient};
use swd_sim::{RegisterFile, SimTransport};

pub const IDCODE: u32 = 0x2BA0_1477;

/// Route `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// A client talking to a simulated target that starts out locked, like a target after power-on.
pub fn connected_client(max_attempts: u32) -> SwdClient<SimTransport<RegisterFile>> {
    init_logging();
    let sim = swd_sim::Builder::new()
        .require_line_reset(true)
        .build(RegisterFile::new(IDCODE));
    let mut client = Builder::new().max_attempts(max_attempts).build(sim);
    assert_eq!(client.connect(), Ok(IDCODE));
    log::debug!("Test client connected");
    client
}
