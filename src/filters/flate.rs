//! FlateDecode and LZWDecode.

use super::DecodeError;
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflate zlib data, reading at most `limit` bytes of output when a limit is set.
pub fn decode_flate(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::new();
    let mut decoder = ZlibDecoder::new(data);

    let read = match limit {
        // One byte past the limit is enough to tell an oversized stream apart.
        Some(limit) => decoder.take(limit as u64 + 1).read_to_end(&mut decoded),
        None => decoder.read_to_end(&mut decoded),
    };
    read.map_err(|e| DecodeError::Corrupt {
        filter: "FlateDecode",
        message: e.to_string(),
    })?;

    if let Some(limit) = limit {
        if decoded.len() > limit {
            return Err(DecodeError::TooLarge { limit });
        }
    }

    Ok(decoded)
}

/// Decode MSB-first LZW with 8-bit symbols, stopping once `limit` is exceeded.
///
/// `early_change` mirrors the `/EarlyChange` parameter: PDF writers default to
/// switching code width one code early, the same convention TIFF uses. Data
/// that ends without an end-of-data code keeps what was decoded so far.
pub fn decode_lzw(data: &[u8], early_change: bool, limit: Option<usize>) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = if early_change {
        weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    } else {
        weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
    };

    let mut decoded = Vec::new();
    let mut buffer = [0u8; 4096];
    let mut input = data;

    loop {
        let result = decoder.decode_bytes(input, &mut buffer);
        input = &input[result.consumed_in..];
        decoded.extend_from_slice(&buffer[..result.consumed_out]);

        if let Some(limit) = limit {
            if decoded.len() > limit {
                return Err(DecodeError::TooLarge { limit });
            }
        }

        match result.status {
            Ok(weezl::LzwStatus::Ok) => {}
            Ok(weezl::LzwStatus::Done | weezl::LzwStatus::NoProgress) => break,
            Err(e) => {
                return Err(DecodeError::Corrupt {
                    filter: "LZWDecode",
                    message: format!("{:?}", e),
                });
            }
        }
    }

    Ok(decoded)
}
