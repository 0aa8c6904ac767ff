//! ASCIIHexDecode and ASCII85Decode.

use super::DecodeError;

fn is_pdf_whitespace(byte: u8) -> bool {
    matches!(byte, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

pub fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &byte in data {
        if is_pdf_whitespace(byte) {
            continue;
        }
        if byte == b'>' {
            break;
        }

        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => {
                return Err(DecodeError::Corrupt {
                    filter: "ASCIIHexDecode",
                    message: format!("invalid hex digit 0x{:02x}", byte),
                });
            }
        };

        match high.take() {
            Some(h) => output.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    // A trailing odd digit is followed by an implied 0.
    if let Some(h) = high {
        output.push(h << 4);
    }

    Ok(output)
}

pub fn decode_ascii85(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let corrupt = |message: String| DecodeError::Corrupt {
        filter: "ASCII85Decode",
        message,
    };

    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut output = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut count = 0;

    for &byte in data {
        if is_pdf_whitespace(byte) {
            continue;
        }
        if byte == b'~' {
            break;
        }
        if byte == b'z' && count == 0 {
            output.extend_from_slice(&[0; 4]);
            continue;
        }
        if !(b'!'..=b'u').contains(&byte) {
            return Err(corrupt(format!("invalid character 0x{:02x}", byte)));
        }

        group[count] = byte - b'!';
        count += 1;
        if count == 5 {
            output.extend_from_slice(&group_value(&group).ok_or_else(|| corrupt("group overflow".into()))?);
            count = 0;
        }
    }

    match count {
        0 => {}
        1 => return Err(corrupt("dangling single character in final group".into())),
        n => {
            group[n..].fill(84);
            let bytes = group_value(&group).ok_or_else(|| corrupt("group overflow".into()))?;
            output.extend_from_slice(&bytes[..n - 1]);
        }
    }

    Ok(output)
}

fn group_value(digits: &[u8; 5]) -> Option<[u8; 4]> {
    let value = digits
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + digit as u64);
    u32::try_from(value).ok().map(u32::to_be_bytes)
}
