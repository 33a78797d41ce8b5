//! An ADIv5 SW-DP with a flat set of AP registers.
use std::collections::HashMap;

use swd_protocol::{
    Direction, Port, Status,
    registers::{abort, ctrl_stat, dp, select},
};

use crate::Target;

// Sticky flag cleared by each ABORT bit
const ABORT_CLEARS: [(u32, u32); 4] = [
    (abort::STKCMPCLR, ctrl_stat::STICKYCMP),
    (abort::STKERRCLR, ctrl_stat::STICKYERR),
    (abort::WDERRCLR, ctrl_stat::WDATAERR),
    (abort::ORUNERRCLR, ctrl_stat::STICKYORUN),
];

/// Bits of CTRL/STAT the host may write
const CTRL_STAT_WRITABLE: u32 =
    ctrl_stat::ORUNDETECT | ctrl_stat::CDBGPWRUPREQ | ctrl_stat::CSYSPWRUPREQ;

/// Register model of a SW-DP.
///
/// AP registers are addressed by the `APSEL` and `APBANKSEL` fields of `SELECT` and the
/// register index. Registers that were never written read as zero.
/// AP reads are posted: each AP read returns the result of the previous one and
/// leaves its own result in `RDBUFF`.
#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    idcode: u32,
    ctrl_stat: u32,
    select: u32,
    rdbuff: u32,
    ap: HashMap<(u8, u8, u8), u32>,
}

impl RegisterFile {
    pub fn new(idcode: u32) -> RegisterFile {
        RegisterFile {
            idcode,
            ..RegisterFile::default()
        }
    }

    pub fn ctrl_stat(&self) -> u32 {
        self.ctrl_stat
    }

    pub fn select(&self) -> u32 {
        self.select
    }

    /// Set sticky flags as if an AP access had failed.
    pub fn set_sticky(&mut self, flags: u32) {
        self.ctrl_stat |= flags & ctrl_stat::STICKY_MASK;
    }

    pub fn ap_register(&self, apsel: u8, bank: u8, index: u8) -> u32 {
        self.ap.get(&(apsel, bank, index)).copied().unwrap_or(0)
    }

    pub fn set_ap_register(&mut self, apsel: u8, bank: u8, index: u8, value: u32) {
        self.ap.insert((apsel, bank, index), value);
    }

    fn selected(&self, index: u8) -> (u8, u8, u8) {
        let (apsel, bank) = select::fields(self.select);
        (apsel, bank, index)
    }

    fn ap_register_selected(&self, index: u8) -> u32 {
        let (apsel, bank, index) = self.selected(index);
        self.ap_register(apsel, bank, index)
    }

    fn has_sticky_error(&self) -> bool {
        self.ctrl_stat & ctrl_stat::STICKY_MASK != 0
    }
}

impl Target for RegisterFile {
    fn status(&mut self, port: Port, direction: Direction, index: u8) -> Status {
        let always_allowed = matches!(
            (port, direction, index),
            (Port::Debug, Direction::Read, dp::DPIDR)
                | (Port::Debug, Direction::Read, dp::CTRL_STAT)
                | (Port::Debug, Direction::Write, dp::ABORT)
        );
        if self.has_sticky_error() && !always_allowed {
            log::debug!(
                "Sticky error set (CTRL/STAT=0x{:08x}), answering FAULT",
                self.ctrl_stat
            );
            Status::Fault
        } else {
            Status::Ack
        }
    }

    fn read(&mut self, port: Port, index: u8) -> u32 {
        match port {
            Port::Debug => match index {
                dp::DPIDR => self.idcode,
                dp::CTRL_STAT => self.ctrl_stat,
                // RESEND and RDBUFF
                _ => self.rdbuff,
            },
            Port::Access => {
                let posted = self.rdbuff;
                self.rdbuff = self.ap_register_selected(index);
                posted
            }
        }
    }

    fn write(&mut self, port: Port, index: u8, value: u32) {
        match (port, index) {
            (Port::Debug, dp::ABORT) => {
                for (clear, sticky) in ABORT_CLEARS {
                    if value & clear != 0 {
                        self.ctrl_stat &= !sticky;
                    }
                }
            }
            (Port::Debug, dp::CTRL_STAT) => {
                let sticky = self.ctrl_stat & ctrl_stat::STICKY_MASK;
                let mut status = sticky | (value & CTRL_STAT_WRITABLE);
                // Power domains come up immediately
                if status & ctrl_stat::CDBGPWRUPREQ != 0 {
                    status |= ctrl_stat::CDBGPWRUPACK;
                }
                if status & ctrl_stat::CSYSPWRUPREQ != 0 {
                    status |= ctrl_stat::CSYSPWRUPACK;
                }
                self.ctrl_stat = status;
            }
            (Port::Debug, dp::SELECT) => self.select = value,
            (Port::Debug, _) => log::debug!("Ignoring write to read-only RDBUFF"),
            (Port::Access, _) => {
                let key = self.selected(index);
                self.ap.insert(key, value);
            }
        }
    }

    fn write_parity_error(&mut self) {
        self.ctrl_stat |= ctrl_stat::WDATAERR;
    }
}

#[cfg(test)]
mod test {
    use super::RegisterFile;
    use crate::Target;
    use swd_protocol::registers::{abort, ctrl_stat, dp, select};
    use swd_protocol::{Direction, Port, Status};

    #[test]
    fn ap_reads_are_posted() {
        let mut registers = RegisterFile::new(0);
        registers.set_ap_register(0, 0, 1, 11);
        registers.set_ap_register(0, 0, 2, 22);

        assert_eq!(registers.read(Port::Access, 1), 0);
        assert_eq!(registers.read(Port::Access, 2), 11);
        assert_eq!(registers.read(Port::Debug, dp::RDBUFF), 22);
        assert_eq!(registers.read(Port::Debug, dp::RESEND), 22);
    }

    #[test]
    fn select_chooses_ap_and_bank() {
        let mut registers = RegisterFile::new(0);
        registers.write(Port::Debug, dp::SELECT, select::value(1, 0xF));
        registers.write(Port::Access, 3, 0xABCD);
        assert_eq!(registers.ap_register(1, 0xF, 3), 0xABCD);
        assert_eq!(registers.ap_register(0, 0, 3), 0);
    }

    #[test]
    fn sticky_errors_fault_until_aborted() {
        let mut registers = RegisterFile::new(0);
        registers.set_sticky(ctrl_stat::STICKYERR | ctrl_stat::WDATAERR);

        assert_eq!(
            registers.status(Port::Access, Direction::Read, 0),
            Status::Fault
        );
        assert_eq!(
            registers.status(Port::Debug, Direction::Write, dp::SELECT),
            Status::Fault
        );
        assert_eq!(
            registers.status(Port::Debug, Direction::Read, dp::CTRL_STAT),
            Status::Ack
        );
        assert_eq!(
            registers.status(Port::Debug, Direction::Write, dp::ABORT),
            Status::Ack
        );

        registers.write(Port::Debug, dp::ABORT, abort::STKERRCLR);
        assert_eq!(registers.ctrl_stat(), ctrl_stat::WDATAERR);
        registers.write(Port::Debug, dp::ABORT, abort::CLEAR_STICKY);
        assert_eq!(registers.ctrl_stat(), 0);
        assert_eq!(
            registers.status(Port::Access, Direction::Read, 0),
            Status::Ack
        );
    }

    #[test]
    fn power_up_is_acknowledged() {
        let mut registers = RegisterFile::new(0);
        registers.write(Port::Debug, dp::CTRL_STAT, ctrl_stat::POWER_UP_REQ);
        assert_eq!(
            registers.read(Port::Debug, dp::CTRL_STAT),
            ctrl_stat::POWER_UP_REQ | ctrl_stat::POWER_UP_ACK
        );
        registers.write(Port::Debug, dp::CTRL_STAT, 0);
        assert_eq!(registers.read(Port::Debug, dp::CTRL_STAT), 0);
    }

    #[test]
    fn ctrl_stat_writes_keep_sticky_flags() {
        let mut registers = RegisterFile::new(0);
        registers.set_sticky(ctrl_stat::STICKYORUN);
        registers.write(Port::Debug, dp::CTRL_STAT, ctrl_stat::STICKY_MASK);
        assert_eq!(registers.ctrl_stat(), ctrl_stat::STICKYORUN);
    }

    #[test]
    fn write_parity_error_sets_wdataerr() {
        let mut registers = RegisterFile::new(0);
        registers.write_parity_error();
        assert_eq!(registers.ctrl_stat(), ctrl_stat::WDATAERR);
    }
}
