// MIT License - Copyright (c) 2024 paradox-link contributors

//! Credential encoder: packs a numeric PIN into the panel's 2-byte
//! nibble-packed wire representation.

/// Encode a PIN for the session-open exchange.
///
/// `None` yields the 2-byte "no credential" sentinel `00 00`. A password
/// containing anything but ASCII digits (including the empty string) is
/// passed through unchanged, so already-encoded credentials survive.
///
/// Digits pack two per byte, most significant first, with digit 0 written as
/// nibble 0xA (a literal 0 nibble is not representable in this scheme). The
/// panel firmware emits one nibble per digit *position* for one more
/// position than the password's length — a phantom leading zero, so the
/// first output nibble of any all-digit password is 0xA — and then truncates
/// to 2 bytes. The quirk is part of the wire format and is preserved here
/// bit-for-bit: `"1234"` encodes to `A1 23`, keeping only the first three
/// digits.
pub fn encode_password(password: Option<&str>) -> Vec<u8> {
    let Some(password) = password else {
        return vec![0x00, 0x00];
    };

    if password.is_empty() || !password.bytes().all(|b| b.is_ascii_digit()) {
        return password.as_bytes().to_vec();
    }

    let mut res = [0u8; 2];
    let nibbles = std::iter::once(0xAu8).chain(password.bytes().map(|b| {
        let d = b - b'0';
        if d == 0 { 0xA } else { d }
    }));

    for (pos, nibble) in nibbles.take(4).enumerate() {
        if pos % 2 == 0 {
            res[pos / 2] |= nibble << 4;
        } else {
            res[pos / 2] |= nibble;
        }
    }

    res.to_vec()
}
