//! Envelope checksum algorithm
//!
//! Ones'-complement style accumulation over little-endian 16-bit words:
//! 1. Build buffer: [Command, 0x00, 0x00, SessionID, ReplyID, Payload]
//! 2. Sum LE u16 words; an odd trailing byte is added as-is
//! 3. Whenever the sum exceeds 0xFFFF, subtract 0xFFFF
//! 4. Complement, then add 0xFFFF while negative
//!
//! Step 4 is not the same as truncating `!sum` to 16 bits: the firmware
//! (and every client that talks to it) normalizes the complement by adding
//! 0xFFFF, which lands one below the naive value. The canonical CONNECT
//! vector `e80317fc...` (checksum 0xFC17, not 0xFC18) pins this down.

use tracing::trace;

/// Checksum over a raw byte buffer.
pub fn calculate_raw(buf: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in buf.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_le_bytes([chunk[0], chunk[1]]) as u32
        } else {
            // Odd trailing byte
            chunk[0] as u32
        };

        sum += word;
        if sum > 0xFFFF {
            sum -= 0xFFFF;
        }
    }

    // Complement, normalized into [0, 0xFFFF]
    let mut checksum = !(sum as i32);
    while checksum < 0 {
        checksum += 0xFFFF;
    }

    checksum as u16
}

/// Checksum of one envelope, with the checksum field taken as zero.
pub fn calculate(command: u16, session_id: u16, reply_id: u16, payload: &[u8]) -> u16 {
    let mut buf = Vec::with_capacity(8 + payload.len());

    buf.extend_from_slice(&command.to_le_bytes());
    buf.extend_from_slice(&[0, 0]); // Checksum placeholder
    buf.extend_from_slice(&session_id.to_le_bytes());
    buf.extend_from_slice(&reply_id.to_le_bytes());
    buf.extend_from_slice(payload);

    let checksum = calculate_raw(&buf);

    trace!(
        command,
        session_id,
        reply_id,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_connect_envelope_checksum() {
        // CONNECT, session 0, reply 65534: the canonical vector
        assert_eq!(calculate(1000, 0, 0xFFFE, &[]), 0xFC17);
    }

    #[test]
    fn test_checksum_all_zero_buffer() {
        // sum 0 -> complement -1 -> +0xFFFF
        assert_eq!(calculate_raw(&[0, 0, 0, 0]), 0xFFFE);
    }

    #[test]
    fn test_checksum_odd_trailing_byte() {
        // 0x0201 + 0x03 = 0x0204; 0xFFFF - 0x0204 - 1 = 0xFDFA
        assert_eq!(calculate_raw(&[0x01, 0x02, 0x03]), 0xFDFA);
    }

    #[test]
    fn test_checksum_saturated_sum() {
        // Two 0xFFFF words fold back to 0xFFFF; complement normalizes twice
        assert_eq!(calculate_raw(&[0xFF, 0xFF, 0xFF, 0xFF]), 0xFFFE);
    }

    #[test]
    fn test_options_envelope_checksum() {
        // OPTIONS_RRQ with a NUL-terminated key, odd payload length
        assert_eq!(
            calculate(11, 0xCDBF, 24, b"~SerialNumber\x00"),
            0xE918
        );
    }

    proptest! {
        /// Appending the checksum to an even-length buffer makes the whole
        /// thing checksum to zero (IP-style complement property).
        #[test]
        fn prop_complemented_buffer_sums_to_zero(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut buf = data;
            if buf.len() % 2 == 1 {
                buf.push(0);
            }
            let ck = calculate_raw(&buf);
            buf.extend_from_slice(&ck.to_le_bytes());
            prop_assert_eq!(calculate_raw(&buf), 0);
        }

        #[test]
        fn prop_checksum_is_deterministic(
            command in any::<u16>(),
            session in any::<u16>(),
            reply in any::<u16>(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            prop_assert_eq!(
                calculate(command, session, reply, &payload),
                calculate(command, session, reply, &payload)
            );
        }
    }
}
