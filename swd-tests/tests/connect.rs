use swd_client::{AccessError, Builder};
use swd_protocol::transport::Transport;
use swd_sim::{RegisterFile, SimTransport};
use swd_tests::{IDCODE, connected_client, init_logging};

#[test]
fn connect_unlocks_a_fresh_target() {
    let client = connected_client(5);
    assert!(!client.transport().is_locked_out());
}

#[test]
fn requests_before_connect_are_ignored() {
    init_logging();
    let sim = swd_sim::Builder::new()
        .require_line_reset(true)
        .build(RegisterFile::new(IDCODE));
    let mut client = Builder::new().max_attempts(5).build(sim);

    // Nobody drives the acknowledgment, so the pull-up reads as 0b111
    assert!(matches!(
        client.idcode(),
        Err(AccessError::Invalid { .. })
    ));
    assert_eq!(client.connect(), Ok(IDCODE));
    assert_eq!(client.idcode(), Ok(IDCODE));
}

#[test]
fn connect_recovers_from_protocol_error() {
    let mut client = connected_client(5);

    // Start bit with a wrong parity bit
    client
        .transport_mut()
        .queue(u32::MAX, 0b1010_0001, 8)
        .unwrap();
    assert!(matches!(
        client.idcode(),
        Err(AccessError::Invalid { .. })
    ));
    assert!(client.transport().is_locked_out());

    assert_eq!(client.connect(), Ok(IDCODE));
    assert!(!client.transport().is_locked_out());
}

#[test]
fn connect_works_without_initial_lockout() {
    init_logging();
    let mut client = Builder::new().build(SimTransport::new(RegisterFile::new(IDCODE)));
    assert_eq!(client.connect(), Ok(IDCODE));
    assert_eq!(client.connect(), Ok(IDCODE));
}
