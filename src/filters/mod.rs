//! Decoding path for stream payloads.
//!
//! `lopdf` models streams but its own decoder refuses image XObjects and hides
//! which filter failed. [`FilterPipeline`] decodes the lossless standard filters
//! and reports anything else as [`DecodeError::Unsupported`], so the caller can
//! leave the stream encoded.

mod ascii;
mod flate;
mod predictor;
mod runlength;

pub use ascii::{decode_ascii85, decode_ascii_hex};
pub use flate::{decode_flate, decode_lzw};
pub use predictor::{PredictorParams, apply_predictor};
pub use runlength::decode_run_length;

use log::debug;
use lopdf::{Dictionary, Object, Stream};
use std::borrow::Cow;
use thiserror::Error;

/// Why a stream payload could not be decoded.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported filter: {0}")]
    Unsupported(String),

    #[error("Malformed stream dictionary: {0}")]
    Malformed(String),

    #[error("{filter} failed: {message}")]
    Corrupt {
        filter: &'static str,
        message: String,
    },

    #[error("Decoded data exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Decodes a stream's payload through the filters its dictionary declares.
///
/// Implementations must not mutate anything; the caller decides what to do with
/// the decoded bytes.
pub trait StreamDecoder {
    fn decode(&self, stream: &Stream) -> Result<Vec<u8>, DecodeError>;
}

impl<D: StreamDecoder + ?Sized> StreamDecoder for &D {
    fn decode(&self, stream: &Stream) -> Result<Vec<u8>, DecodeError> {
        (**self).decode(stream)
    }
}

/// Filters this crate can undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Flate,
    Lzw,
    AsciiHex,
    Ascii85,
    RunLength,
    Crypt,
}

impl FilterKind {
    /// Resolve a filter name, including the inline-image abbreviations.
    pub fn from_name(name: &[u8]) -> Result<Self, DecodeError> {
        match name {
            b"FlateDecode" | b"Fl" => Ok(FilterKind::Flate),
            b"LZWDecode" | b"LZW" => Ok(FilterKind::Lzw),
            b"ASCIIHexDecode" | b"AHx" => Ok(FilterKind::AsciiHex),
            b"ASCII85Decode" | b"A85" => Ok(FilterKind::Ascii85),
            b"RunLengthDecode" | b"RL" => Ok(FilterKind::RunLength),
            b"Crypt" => Ok(FilterKind::Crypt),
            other => Err(DecodeError::Unsupported(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Flate => "FlateDecode",
            FilterKind::Lzw => "LZWDecode",
            FilterKind::AsciiHex => "ASCIIHexDecode",
            FilterKind::Ascii85 => "ASCII85Decode",
            FilterKind::RunLength => "RunLengthDecode",
            FilterKind::Crypt => "Crypt",
        }
    }

    fn decode(
        &self,
        data: &[u8],
        params: Option<&Dictionary>,
        limit: Option<usize>,
    ) -> Result<Vec<u8>, DecodeError> {
        match self {
            FilterKind::Flate => {
                let predictor = PredictorParams::from_dict(params)?;
                apply_predictor(decode_flate(data, limit)?, &predictor)
            }
            FilterKind::Lzw => {
                let predictor = PredictorParams::from_dict(params)?;
                let early_change = match params {
                    Some(dict) => predictor::int_param(dict, b"EarlyChange", 1)? != 0,
                    None => true,
                };
                apply_predictor(decode_lzw(data, early_change, limit)?, &predictor)
            }
            FilterKind::AsciiHex => decode_ascii_hex(data),
            FilterKind::Ascii85 => decode_ascii85(data),
            FilterKind::RunLength => decode_run_length(data),
            FilterKind::Crypt => {
                // Only the Identity crypt filter is a pass-through; named ones need the security handler.
                let name = params
                    .and_then(|dict| dict.get(b"Name").ok())
                    .and_then(|name| name.as_name().ok())
                    .unwrap_or(b"Identity".as_slice());
                if name == b"Identity" {
                    Ok(data.to_vec())
                } else {
                    Err(DecodeError::Unsupported(format!(
                        "Crypt/{}",
                        String::from_utf8_lossy(name)
                    )))
                }
            }
        }
    }
}

/// The default [`StreamDecoder`]: applies `/Filter` in order with the matching
/// `/DecodeParms` entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterPipeline {
    max_decoded_len: Option<usize>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to produce more than `max_decoded_len` bytes from any single stage.
    pub fn with_limit(max_decoded_len: usize) -> Self {
        Self {
            max_decoded_len: Some(max_decoded_len),
        }
    }

    pub fn max_decoded_len(&self) -> Option<usize> {
        self.max_decoded_len
    }
}

impl StreamDecoder for FilterPipeline {
    fn decode(&self, stream: &Stream) -> Result<Vec<u8>, DecodeError> {
        let filters = filter_names(&stream.dict)?;
        let params = decode_params(&stream.dict, filters.len())?;

        let mut data = Cow::Borrowed(stream.content.as_slice());
        for (name, params) in filters.into_iter().zip(params) {
            let kind = FilterKind::from_name(name)?;
            let decoded = kind.decode(&data, params, self.max_decoded_len)?;
            if let Some(limit) = self.max_decoded_len {
                if decoded.len() > limit {
                    return Err(DecodeError::TooLarge { limit });
                }
            }
            debug!("{}: {} -> {} bytes", kind.name(), data.len(), decoded.len());
            data = Cow::Owned(decoded);
        }

        Ok(data.into_owned())
    }
}

/// The `/Filter` entry as a list of names. Absent means no filters.
pub fn filter_names(dict: &Dictionary) -> Result<Vec<&[u8]>, DecodeError> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Ok(Vec::new());
    };

    match filter {
        Object::Name(name) => Ok(vec![name.as_slice()]),
        Object::Array(items) => items
            .iter()
            .map(|item| match item {
                Object::Name(name) => Ok(name.as_slice()),
                other => Err(DecodeError::Malformed(format!(
                    "/Filter array holds {}",
                    variant_name(other)
                ))),
            })
            .collect(),
        Object::Null => Ok(Vec::new()),
        other => Err(DecodeError::Malformed(format!(
            "/Filter is {}",
            variant_name(other)
        ))),
    }
}

/// The `/DecodeParms` entry aligned with `count` filters.
pub fn decode_params(dict: &Dictionary, count: usize) -> Result<Vec<Option<&Dictionary>>, DecodeError> {
    let mut params = vec![None; count];
    let Ok(entry) = dict.get(b"DecodeParms") else {
        return Ok(params);
    };

    match entry {
        Object::Null => {}
        Object::Dictionary(single) => {
            if let Some(first) = params.first_mut() {
                *first = Some(single);
            }
        }
        Object::Array(items) => {
            for (slot, item) in params.iter_mut().zip(items) {
                *slot = match item {
                    Object::Dictionary(dict) => Some(dict),
                    Object::Null => None,
                    other => {
                        return Err(DecodeError::Malformed(format!(
                            "/DecodeParms array holds {}",
                            variant_name(other)
                        )));
                    }
                };
            }
        }
        other => {
            return Err(DecodeError::Malformed(format!(
                "/DecodeParms is {}",
                variant_name(other)
            )));
        }
    }

    Ok(params)
}

pub(crate) fn variant_name(object: &Object) -> &'static str {
    match object {
        Object::Null => "null",
        Object::Boolean(_) => "a boolean",
        Object::Integer(_) => "an integer",
        Object::Real(_) => "a real",
        Object::Name(_) => "a name",
        Object::String(..) => "a string",
        Object::Array(_) => "an array",
        Object::Dictionary(_) => "a dictionary",
        Object::Stream(_) => "a stream",
        Object::Reference(_) => "an indirect reference",
    }
}
