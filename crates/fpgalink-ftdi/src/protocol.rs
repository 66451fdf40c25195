//! FTDI protocol constants
//!
//! Serial channel parameters for the AT-command link, and the MPSSE opcodes
//! used to drive a JTAG TAP.

// ============================================================================
// Serial channel
// ============================================================================

/// Baud rate of the AT-command link
pub const AT_BAUD_RATE: u32 = 115_200;

/// Default latency timer in milliseconds
pub const DEFAULT_LATENCY: u8 = 255;

/// Read call attempts before giving up on a response
pub const MAX_READ_ATTEMPTS: u32 = 50;

/// Response buffer length for a baud rate
///
/// One buffer holds what the link can carry in roughly 1/512 s.
pub const fn response_len(baud: u32) -> usize {
    (baud / 512) as usize
}

// ============================================================================
// MPSSE Commands
// ============================================================================

/// Write bytes on negative clock edge
pub const MPSSE_DO_WRITE: u8 = 0x10;

/// Read bytes on positive clock edge
pub const MPSSE_DO_READ: u8 = 0x20;

/// Write TMS bits
pub const MPSSE_WRITE_TMS: u8 = 0x40;

/// Write on negative clock edge
pub const MPSSE_WRITE_NEG: u8 = 0x01;

/// Bit mode (transfer bits instead of bytes)
pub const MPSSE_BITMODE: u8 = 0x02;

/// LSB first, as JTAG shifts
pub const MPSSE_LSB: u8 = 0x08;

/// Clock TMS bits out, LSB first, on the negative edge
pub const TMS_SHIFT: u8 = MPSSE_WRITE_TMS | MPSSE_LSB | MPSSE_BITMODE | MPSSE_WRITE_NEG;

/// Clock bytes in and out on TDI/TDO, LSB first
pub const TDI_TDO_SHIFT: u8 = MPSSE_DO_WRITE | MPSSE_DO_READ | MPSSE_LSB | MPSSE_WRITE_NEG;

/// Set data bits low byte
pub const SET_BITS_LOW: u8 = 0x80;

/// Disable loopback mode
pub const LOOPBACK_END: u8 = 0x85;

/// Set clock divisor
pub const TCK_DIVISOR: u8 = 0x86;

/// Send immediate (flush buffers)
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Disable divide-by-5 prescaler (60 MHz clock)
pub const DIS_DIV_5: u8 = 0x8A;

/// Disable adaptive clocking
pub const CLK_NO_ADAPTIVE: u8 = 0x97;

// ============================================================================
// Pin assignments (low byte)
//
// TCK is bit 0.
// TDI is bit 1.
// TDO is bit 2.
// TMS is bit 3.
// ============================================================================

/// Bit position for TCK
pub const PIN_TCK: u8 = 0;

/// Bit position for TDI
pub const PIN_TDI: u8 = 1;

/// Bit position for TMS
pub const PIN_TMS: u8 = 3;

/// Idle pin state: TMS high, everything else low
pub const IDLE_BITS: u8 = 1 << PIN_TMS;

/// TCK, TDI and TMS are outputs
pub const JTAG_PINDIR: u8 = (1 << PIN_TCK) | (1 << PIN_TDI) | (1 << PIN_TMS);

/// MPSSE base clock with the divide-by-5 prescaler off
pub const BASE_CLOCK_HZ: u32 = 60_000_000;

/// Compute the TCK divisor value for a target frequency
///
/// TCK = 60 MHz / ((1 + divisor) * 2). Frequencies that cannot be reached
/// are rounded down to the nearest achievable one.
pub fn tck_divisor(frequency: u32) -> u16 {
    let half = BASE_CLOCK_HZ / 2;
    if frequency == 0 || frequency >= half {
        return 0;
    }
    let divisor = half.div_ceil(frequency) - 1;
    divisor.min(u16::MAX as u32) as u16
}

/// Actual TCK frequency for a divisor value
pub fn tck_frequency(divisor: u16) -> u32 {
    BASE_CLOCK_HZ / ((1 + divisor as u32) * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_len() {
        assert_eq!(response_len(AT_BAUD_RATE), 225);
    }

    #[test]
    fn test_tck_divisor() {
        assert_eq!(tck_divisor(30_000_000), 0);
        assert_eq!(tck_divisor(60_000_000), 0);
        assert_eq!(tck_divisor(6_000_000), 4);
        assert_eq!(tck_frequency(4), 6_000_000);
        assert_eq!(tck_divisor(1_000_000), 29);
        // 7 MHz is not reachable, round down to 6 MHz
        assert_eq!(tck_frequency(tck_divisor(7_000_000)), 6_000_000);
        assert_eq!(tck_divisor(1), u16::MAX);
    }

    #[test]
    fn test_opcodes() {
        assert_eq!(TMS_SHIFT, 0x4B);
        assert_eq!(TDI_TDO_SHIFT, 0x39);
    }
}
