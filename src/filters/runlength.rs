//! RunLengthDecode.

use super::DecodeError;

pub fn decode_run_length(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let truncated = || DecodeError::Corrupt {
        filter: "RunLengthDecode",
        message: "unexpected end of data".into(),
    };

    let mut output = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        i += 1;

        match length {
            128 => break,
            0..=127 => {
                let literal = data.get(i..i + length + 1).ok_or_else(truncated)?;
                output.extend_from_slice(literal);
                i += length + 1;
            }
            _ => {
                let byte = *data.get(i).ok_or_else(truncated)?;
                output.resize(output.len() + 257 - length, byte);
                i += 1;
            }
        }
    }

    Ok(output)
}
