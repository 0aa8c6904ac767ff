//! TIFF and PNG predictors used by FlateDecode and LZWDecode.

use super::{DecodeError, variant_name};
use lopdf::Dictionary;

/// Predictor settings read from a filter's `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    /// 1 = none, 2 = TIFF, 10-15 = PNG
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(params: Option<&Dictionary>) -> Result<Self, DecodeError> {
        let Some(dict) = params else {
            return Ok(Self::default());
        };

        let predictor = int_param(dict, b"Predictor", 1)?;
        let colors = int_param(dict, b"Colors", 1)?;
        let bits_per_component = int_param(dict, b"BitsPerComponent", 8)?;
        let columns = int_param(dict, b"Columns", 1)?;

        if colors < 1 || columns < 1 {
            return Err(DecodeError::Malformed(format!(
                "invalid predictor geometry: Colors {} Columns {}",
                colors, columns
            )));
        }
        if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
            return Err(DecodeError::Malformed(format!(
                "invalid BitsPerComponent {}",
                bits_per_component
            )));
        }

        Ok(Self {
            predictor,
            colors: to_usize(colors, "Colors")?,
            bits_per_component: bits_per_component as usize,
            columns: to_usize(columns, "Columns")?,
        })
    }

    fn bits_per_pixel(&self) -> Result<usize, DecodeError> {
        self.colors
            .checked_mul(self.bits_per_component)
            .ok_or_else(|| self.overflow())
    }

    fn bytes_per_pixel(&self) -> Result<usize, DecodeError> {
        Ok(self.bits_per_pixel()?.div_ceil(8).max(1))
    }

    /// Row size in bytes, excluding the PNG tag byte.
    fn bytes_per_row(&self) -> Result<usize, DecodeError> {
        let bits = self
            .bits_per_pixel()?
            .checked_mul(self.columns)
            .ok_or_else(|| self.overflow())?;
        Ok(bits.div_ceil(8))
    }

    fn overflow(&self) -> DecodeError {
        DecodeError::Malformed(format!(
            "predictor row overflows: Colors {} BitsPerComponent {} Columns {}",
            self.colors, self.bits_per_component, self.columns
        ))
    }
}

fn to_usize(value: i64, key: &str) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::Malformed(format!("/{} {} out of range", key, value)))
}

/// Read an integer entry, falling back to `default` when the key is absent.
pub(crate) fn int_param(dict: &Dictionary, key: &[u8], default: i64) -> Result<i64, DecodeError> {
    match dict.get(key) {
        Ok(value) => value.as_i64().map_err(|_| {
            DecodeError::Malformed(format!(
                "/{} must be an integer, found {}",
                String::from_utf8_lossy(key),
                variant_name(value)
            ))
        }),
        Err(_) => Ok(default),
    }
}

/// Undo the predictor described by `params`. A predictor below 2 is a no-op.
pub fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, DecodeError> {
    match params.predictor {
        p if p < 2 => Ok(data),
        2 => decode_tiff(&data, params),
        10..=15 => decode_png(&data, params),
        other => Err(DecodeError::Unsupported(format!("Predictor {}", other))),
    }
}

fn decode_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, DecodeError> {
    // Sub-byte and 16-bit samples would need bit-level differencing.
    if params.bits_per_component != 8 {
        return Err(DecodeError::Unsupported(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }

    let row_len = params.bytes_per_row()?;
    let bpp = params.bytes_per_pixel()?;
    let mut output = Vec::with_capacity(data.len());

    for row in data.chunks(row_len) {
        let start = output.len();
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bpp { output[start + i - bpp] } else { 0 };
            output.push(byte.wrapping_add(left));
        }
    }

    Ok(output)
}

fn decode_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, DecodeError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let row_len = params.bytes_per_row()?;
    let bpp = params.bytes_per_pixel()?;
    // The row buffers are sized from /Columns, so it must agree with the payload.
    if row_len >= data.len() {
        return Err(DecodeError::Malformed(format!(
            "PNG predictor row of {} bytes does not fit in {} bytes of data",
            row_len,
            data.len()
        )));
    }

    let mut output = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];
    let mut current = vec![0u8; row_len];

    // Each encoded row carries its own PNG filter tag; a short final row is kept as is.
    for encoded in data.chunks(row_len + 1) {
        let (&tag, row) = match encoded.split_first() {
            Some(parts) => parts,
            None => continue,
        };

        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };

            current[i] = match tag {
                0 => byte,
                1 => byte.wrapping_add(left),
                2 => byte.wrapping_add(up),
                3 => byte.wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => byte.wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(DecodeError::Corrupt {
                        filter: "Predictor",
                        message: format!("unknown PNG row filter {}", other),
                    });
                }
            };
        }

        output.extend_from_slice(&current[..row.len()]);
        std::mem::swap(&mut previous, &mut current);
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
