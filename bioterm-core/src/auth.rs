//! CommKey authentication scramble
//!
//! When a device has a communication password set, CONNECT answers with
//! ACK_UNAUTH and the session id to use. The client must reply with an AUTH
//! command whose payload is the password scrambled against that session id.

use bytes::Bytes;

/// Derive the 4-byte AUTH payload from password and session id.
///
/// # Algorithm
///
/// 1. Bit-reverse the 32-bit password into an accumulator
/// 2. Add the session id (wrapping)
/// 3. XOR the four bytes with `'Z'`, `'K'`, `'S'`, `'O'`
/// 4. Swap the two 16-bit halves
/// 5. XOR bytes 0, 1 and 3 with the low byte of `ticks`; byte 2 becomes
///    `ticks` itself
///
/// `ticks` is a fixed constant in practice; every known client passes 50.
pub fn make_commkey(password: u32, session_id: u16, ticks: u8) -> Bytes {
    let mut k: u32 = 0;
    for i in 0..32 {
        k <<= 1;
        if password & (1 << i) != 0 {
            k |= 1;
        }
    }

    k = k.wrapping_add(session_id as u32);

    let bytes = k.to_le_bytes();
    let xored = [
        bytes[0] ^ b'Z',
        bytes[1] ^ b'K',
        bytes[2] ^ b'S',
        bytes[3] ^ b'O',
    ];

    // Swap the 16-bit halves
    let swapped = [xored[2], xored[3], xored[0], xored[1]];

    let result = [
        swapped[0] ^ ticks,
        swapped[1] ^ ticks,
        ticks,
        swapped[3] ^ ticks,
    ];

    Bytes::copy_from_slice(&result)
}
