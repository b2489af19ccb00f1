//! Device option (`KEY=VALUE\0`) reply parsing.

use crate::codec::decode_str;

/// Extract the value from an OPTIONS_RRQ reply payload.
///
/// The reply is `KEY=VALUE\0`; the value is whatever follows the *last*
/// `=`, trimmed at the first NUL. A payload without `=` yields `None`.
pub fn parse_option_value(payload: &[u8]) -> Option<String> {
    let text = decode_str(payload);
    text.rfind('=').map(|i| text[i + 1..].to_string())
}
