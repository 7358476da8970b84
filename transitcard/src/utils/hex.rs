//! Hexadecimal helpers for log traces, selectors and key parsing.

use std::fmt::Write;

/// Lowercase hex without separators.
///
/// Example: `&[0xde, 0xad]` -> `"dead"`
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // write! never fails writing to a String
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

/// Lowercase hex with a single space between bytes.
///
/// Example: `&[0xde, 0xad]` -> `"de ad"`
pub fn bytes_to_hex_spaced(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i != 0 {
            s.push(' ');
        }
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

/// Multi-line dump, 16 bytes per line prefixed with the offset.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut s = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        if line != 0 {
            s.push('\n');
        }
        let _ = write!(&mut s, "{:04x}: {}", line * 16, bytes_to_hex_spaced(chunk));
    }
    s
}

/// Parse hex into bytes. Whitespace and `:` separators are ignored.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err("hex string has odd length".to_string());
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text: String = pair.iter().collect();
            u8::from_str_radix(&text, 16)
                .map_err(|e| format!("invalid hex pair '{}': {}", text, e))
        })
        .collect()
}
