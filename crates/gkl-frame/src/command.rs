//! Wire constants and the command table.
//!
//! The reply payload length is a pure function of the command byte. Commands
//! missing from the table carry no payload.

/// Start-of-frame marker.
pub const SYN: u8 = 0x02;

/// High byte of the station address; always zero.
pub const ADDR_HI: u8 = 0x00;

/// Lowest valid station address.
pub const MIN_STATION: u8 = 1;

/// Highest valid station address.
pub const MAX_STATION: u8 = 32;

/// Status request / status reply.
pub const STATUS: u8 = b'S';

/// Stop dispensing.
pub const STOP: u8 = b'B';

/// Returns the payload length a reply with this command code carries.
pub fn expected_payload_len(command: u8) -> usize {
    match command {
        b'S' => 2,
        b'L' => 10,
        b'R' => 10,
        b'T' => 22,
        b'C' => 11,
        b'Z' => 6,
        b'D' => 2,
        _ => 0,
    }
}

/// Returns a human-readable name for a command code.
pub fn command_name(command: u8) -> &'static str {
    match command {
        STATUS => "STATUS",
        STOP => "STOP",
        b'L' => "VOLUME",
        b'R' => "AMOUNT",
        b'T' | b'C' | b'Z' | b'D' => "REPLY",
        _ => "UNKNOWN",
    }
}

/// Returns true if the address can be put on the wire.
pub fn is_valid_station(address: u8) -> bool {
    (MIN_STATION..=MAX_STATION).contains(&address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_table_matches_protocol() {
        let table = [
            (b'S', 2),
            (b'L', 10),
            (b'R', 10),
            (b'T', 22),
            (b'C', 11),
            (b'Z', 6),
            (b'D', 2),
        ];
        for (command, len) in table {
            assert_eq!(expected_payload_len(command), len, "command {}", command as char);
        }
    }

    #[test]
    fn unknown_commands_have_no_payload() {
        assert_eq!(expected_payload_len(STOP), 0);
        assert_eq!(expected_payload_len(b'Q'), 0);
        assert_eq!(expected_payload_len(0x00), 0);
    }

    #[test]
    fn station_range() {
        assert!(!is_valid_station(0));
        assert!(is_valid_station(1));
        assert!(is_valid_station(32));
        assert!(!is_valid_station(33));
    }

    #[test]
    fn names() {
        assert_eq!(command_name(STATUS), "STATUS");
        assert_eq!(command_name(STOP), "STOP");
        assert_eq!(command_name(b'x'), "UNKNOWN");
    }
}
