use swd_protocol::registers::{ctrl_stat, dp, select};
use swd_tests::connected_client;

#[test]
fn ap_registers_round_trip() {
    let mut client = connected_client(5);
    client.select(0, 0).unwrap();
    client.write_ap(1, 0x2000_0000).unwrap();
    client.write_ap(3, 0xDEAD_BEEF).unwrap();

    assert_eq!(client.read_ap(1), Ok(0x2000_0000));
    assert_eq!(client.read_ap(3), Ok(0xDEAD_BEEF));
    assert_eq!(client.read_ap(2), Ok(0));
}

#[test]
fn select_switches_ap_and_bank() {
    let mut client = connected_client(5);
    client.select(1, 0xF).unwrap();
    client.write_ap(3, 0x0477_0021).unwrap();
    client.select(0, 0).unwrap();
    client.write_ap(3, 7).unwrap();

    let registers = client.transport().target();
    assert_eq!(registers.select(), select::value(0, 0));
    assert_eq!(registers.ap_register(1, 0xF, 3), 0x0477_0021);
    assert_eq!(registers.ap_register(0, 0, 3), 7);

    client.select(1, 0xF).unwrap();
    assert_eq!(client.read_ap(3), Ok(0x0477_0021));
}

#[test]
fn posted_result_is_left_in_rdbuff() {
    let mut client = connected_client(5);
    client
        .transport_mut()
        .target_mut()
        .set_ap_register(0, 0, 0, 0x2300_0052);
    assert_eq!(client.read_ap(0), Ok(0x2300_0052));
    assert_eq!(client.read_dp(dp::RDBUFF), Ok(0x2300_0052));
}

#[test]
fn power_up_after_connect() {
    let mut client = connected_client(5);
    client.clear_sticky_errors().unwrap();
    let status = client.power_up().unwrap();
    assert_eq!(status & ctrl_stat::POWER_UP_ACK, ctrl_stat::POWER_UP_ACK);
    assert_eq!(
        client.transport().target().ctrl_stat() & ctrl_stat::POWER_UP_REQ,
        ctrl_stat::POWER_UP_REQ
    );
}

#[test]
fn long_sessions_keep_the_buffer_small() {
    let mut client = connected_client(5);
    client.select(0, 0).unwrap();
    for value in 0..2000 {
        client.write_ap(1, value).unwrap();
        assert_eq!(client.read_ap(1), Ok(value));
    }
    // The last RDBUFF read frame
    assert_eq!(client.transport().buffer().len(), 51);
}
