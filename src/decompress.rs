//! Strip the filter chain from every stream in a document.

use crate::filters::{DecodeError, FilterPipeline, StreamDecoder};
use crate::walker::{ObjectVisitor, walk_document};
use log::{debug, info, warn};
use lopdf::{Document, Object, ObjectId, Stream};

/// Dictionary keys that describe a stream's encoding. `D` is dropped alongside
/// the others but never interpreted.
pub const FILTER_KEYS: [&[u8]; 3] = [b"Filter", b"DecodeParms", b"D"];

/// Stream types `lopdf` unpacks on load and never writes back as they are.
const CONTAINER_TYPES: [&[u8]; 2] = [b"ObjStm", b"XRef"];

/// What happened to a single stream.
#[derive(Debug)]
pub enum StreamOutcome {
    /// No filter-related keys; the stream was not touched.
    Unfiltered,
    Decompressed {
        encoded_len: usize,
        decoded_len: usize,
    },
    /// Decoding failed; the stream keeps its original dictionary and payload.
    Failed(DecodeError),
    /// An object stream or cross-reference stream, left for `lopdf` to rewrite.
    Skipped,
}

/// Totals for one [`decompress_all_streams`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressReport {
    pub objects_visited: usize,
    pub dangling_references: usize,
    pub streams_seen: usize,
    pub streams_decompressed: usize,
    pub streams_unfiltered: usize,
    pub streams_failed: usize,
    pub streams_skipped: usize,
    /// Encoded payload bytes of the streams that were decompressed.
    pub bytes_before: usize,
    /// Decoded payload bytes of the same streams.
    pub bytes_after: usize,
}

impl DecompressReport {
    fn record(&mut self, outcome: &StreamOutcome) {
        self.streams_seen += 1;
        match outcome {
            StreamOutcome::Unfiltered => self.streams_unfiltered += 1,
            StreamOutcome::Decompressed {
                encoded_len,
                decoded_len,
            } => {
                self.streams_decompressed += 1;
                self.bytes_before += encoded_len;
                self.bytes_after += decoded_len;
            }
            StreamOutcome::Failed(_) => self.streams_failed += 1,
            StreamOutcome::Skipped => self.streams_skipped += 1,
        }
    }
}

pub fn has_filter_keys(stream: &Stream) -> bool {
    FILTER_KEYS.iter().any(|key| stream.dict.has(key))
}

/// Whether `stream` is an object stream or cross-reference stream.
pub fn is_container_stream(stream: &Stream) -> bool {
    CONTAINER_TYPES.iter().any(|kind| stream.dict.has_type(kind))
}

/// Decode one stream and store the result raw.
///
/// The stream is only modified once decoding has fully succeeded, so a failure
/// leaves it exactly as it was.
pub fn decompress_stream<D: StreamDecoder + ?Sized>(stream: &mut Stream, decoder: &D) -> StreamOutcome {
    if !has_filter_keys(stream) {
        return StreamOutcome::Unfiltered;
    }

    let decoded = match decoder.decode(stream) {
        Ok(decoded) => decoded,
        Err(e) => return StreamOutcome::Failed(e),
    };

    for key in FILTER_KEYS {
        stream.dict.remove(key);
    }

    let encoded_len = stream.content.len();
    let decoded_len = decoded.len();
    stream.content = decoded;
    stream.dict.set("Length", Object::Integer(decoded_len as i64));

    StreamOutcome::Decompressed {
        encoded_len,
        decoded_len,
    }
}

struct Decompressor<'d, D: ?Sized> {
    decoder: &'d D,
    report: DecompressReport,
}

impl<D: StreamDecoder + ?Sized> ObjectVisitor for Decompressor<'_, D> {
    fn visit_stream(&mut self, owner: ObjectId, stream: &mut Stream) {
        let outcome = if is_container_stream(stream) {
            StreamOutcome::Skipped
        } else {
            decompress_stream(stream, self.decoder)
        };
        match &outcome {
            StreamOutcome::Failed(e) => {
                warn!("Leaving stream in object {} {} R encoded: {}", owner.0, owner.1, e);
            }
            StreamOutcome::Decompressed {
                encoded_len,
                decoded_len,
            } => {
                debug!(
                    "Decompressed stream in object {} {} R: {} -> {} bytes",
                    owner.0, owner.1, encoded_len, decoded_len
                );
            }
            StreamOutcome::Skipped => {
                debug!("Skipping container stream in object {} {} R", owner.0, owner.1);
            }
            StreamOutcome::Unfiltered => {}
        }
        self.report.record(&outcome);
    }
}

/// Decompress every stream in `doc` in place using [`FilterPipeline`].
///
/// Streams that cannot be decoded are logged and left as they are; this never fails.
pub fn decompress_all_streams(doc: &mut Document) -> DecompressReport {
    decompress_all_streams_with(doc, &FilterPipeline::new())
}

/// Like [`decompress_all_streams`], with a caller-supplied decoder.
pub fn decompress_all_streams_with<D: StreamDecoder + ?Sized>(
    doc: &mut Document,
    decoder: &D,
) -> DecompressReport {
    let mut decompressor = Decompressor {
        decoder,
        report: DecompressReport::default(),
    };
    let summary = walk_document(doc, &mut decompressor);

    let mut report = decompressor.report;
    report.objects_visited = summary.objects_visited;
    report.dangling_references = summary.dangling_references;

    info!(
        "Decompressed {} of {} streams ({} failed, {} unfiltered, {} skipped), {} -> {} bytes",
        report.streams_decompressed,
        report.streams_seen,
        report.streams_failed,
        report.streams_unfiltered,
        report.streams_skipped,
        report.bytes_before,
        report.bytes_after
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Dictionary;

    #[test]
    fn test_unfiltered_stream_untouched() {
        let mut stream = Stream::new(Dictionary::new(), b"BT ET".to_vec());
        let outcome = decompress_stream(&mut stream, &FilterPipeline::new());
        assert!(matches!(outcome, StreamOutcome::Unfiltered));
        assert_eq!(stream.content, b"BT ET");
    }

    #[test]
    fn test_d_key_alone_is_stripped() {
        let mut dict = Dictionary::new();
        dict.set("D", Object::Array(vec![Object::Integer(1), Object::Integer(0)]));
        let mut stream = Stream::new(dict, b"abc".to_vec());

        let outcome = decompress_stream(&mut stream, &FilterPipeline::new());

        assert!(matches!(
            outcome,
            StreamOutcome::Decompressed {
                encoded_len: 3,
                decoded_len: 3
            }
        ));
        assert!(!stream.dict.has(b"D"));
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn test_failure_leaves_stream_intact() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"JBIG2Decode".to_vec()));
        let mut stream = Stream::new(dict, vec![0x97, 0x4a, 0x42]);

        let outcome = decompress_stream(&mut stream, &FilterPipeline::new());

        assert!(matches!(outcome, StreamOutcome::Failed(DecodeError::Unsupported(_))));
        assert!(stream.dict.has(b"Filter"));
        assert_eq!(stream.content, vec![0x97, 0x4a, 0x42]);
    }

    #[test]
    fn test_container_streams_detected() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        assert!(is_container_stream(&Stream::new(dict, Vec::new())));

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        assert!(!is_container_stream(&Stream::new(dict, Vec::new())));
    }

    #[test]
    fn test_report_accumulates() {
        let mut report = DecompressReport::default();
        report.record(&StreamOutcome::Unfiltered);
        report.record(&StreamOutcome::Decompressed {
            encoded_len: 10,
            decoded_len: 40,
        });
        report.record(&StreamOutcome::Failed(DecodeError::Unsupported("DCTDecode".into())));
        report.record(&StreamOutcome::Skipped);

        assert_eq!(report.streams_seen, 4);
        assert_eq!(report.streams_skipped, 1);
        assert_eq!(report.streams_unfiltered, 1);
        assert_eq!(report.streams_decompressed, 1);
        assert_eq!(report.streams_failed, 1);
        assert_eq!((report.bytes_before, report.bytes_after), (10, 40));
    }
}
