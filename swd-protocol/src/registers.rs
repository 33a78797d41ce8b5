//! Register indices and bit fields of an ADIv5 SW-DP.

/// Debug Port register indices (`A[3:2]`).
pub mod dp {
    /// Identification code, read only
    pub const DPIDR: u8 = 0;
    /// Clears sticky errors, write only
    pub const ABORT: u8 = 0;
    pub const CTRL_STAT: u8 = 1;
    /// AP and bank selection, write only
    pub const SELECT: u8 = 2;
    /// Returns the last AP read result again, read only
    pub const RESEND: u8 = 2;
    /// Result of the last posted AP read, read only
    pub const RDBUFF: u8 = 3;
}

/// Bits of the `ABORT` register
pub mod abort {
    pub const DAPABORT: u32 = 1 << 0;
    pub const STKCMPCLR: u32 = 1 << 1;
    pub const STKERRCLR: u32 = 1 << 2;
    pub const WDERRCLR: u32 = 1 << 3;
    pub const ORUNERRCLR: u32 = 1 << 4;

    /// Clears every sticky flag
    pub const CLEAR_STICKY: u32 = STKCMPCLR | STKERRCLR | WDERRCLR | ORUNERRCLR;
}

/// Bits of the `CTRL/STAT` register
pub mod ctrl_stat {
    pub const ORUNDETECT: u32 = 1 << 0;
    pub const STICKYORUN: u32 = 1 << 1;
    pub const STICKYCMP: u32 = 1 << 4;
    pub const STICKYERR: u32 = 1 << 5;
    pub const READOK: u32 = 1 << 6;
    pub const WDATAERR: u32 = 1 << 7;
    pub const CDBGPWRUPREQ: u32 = 1 << 28;
    pub const CDBGPWRUPACK: u32 = 1 << 29;
    pub const CSYSPWRUPREQ: u32 = 1 << 30;
    pub const CSYSPWRUPACK: u32 = 1 << 31;

    /// Any of these makes the DP answer `FAULT`
    pub const STICKY_MASK: u32 = STICKYORUN | STICKYCMP | STICKYERR | WDATAERR;
    pub const POWER_UP_REQ: u32 = CDBGPWRUPREQ | CSYSPWRUPREQ;
    pub const POWER_UP_ACK: u32 = CDBGPWRUPACK | CSYSPWRUPACK;
}

/// Fields of the `SELECT` register
pub mod select {
    pub const APSEL_SHIFT: u32 = 24;
    pub const APBANKSEL_SHIFT: u32 = 4;
    pub const APBANKSEL_MASK: u32 = 0xF << APBANKSEL_SHIFT;

    /// The `SELECT` value addressing bank `bank` of access port `apsel`.
    pub fn value(apsel: u8, bank: u8) -> u32 {
        (u32::from(apsel) << APSEL_SHIFT) | ((u32::from(bank) << APBANKSEL_SHIFT) & APBANKSEL_MASK)
    }

    /// Splits a `SELECT` value into access port and bank.
    pub fn fields(value: u32) -> (u8, u8) {
        (
            (value >> APSEL_SHIFT) as u8,
            ((value & APBANKSEL_MASK) >> APBANKSEL_SHIFT) as u8,
        )
    }
}

#[test]
fn select_fields() {
    assert_eq!(select::value(1, 0), 0x0100_0000);
    assert_eq!(select::value(0, 0xF), 0xF0);
    assert_eq!(select::fields(select::value(0x12, 3)), (0x12, 3));
}
