//! Decompress every stream of a PDF in place.
//!
//! The core is a cycle-safe walk over the indirect object graph
//! ([`walker`]) that hands each stream to a decoder ([`filters`]) and stores
//! the decoded bytes raw ([`decompress`]). The helpers in this module wrap it
//! the way a service would: load bytes, decompress, save without compression.
use log::{debug, error};
use lopdf::{encryption::DecryptionError, xref::XrefType};
use std::path::Path;
use thiserror::Error;

pub mod decompress;
pub mod filters;
pub mod walker;

pub use decompress::{
    DecompressReport, StreamOutcome, decompress_all_streams, decompress_all_streams_with,
    decompress_stream,
};
pub use filters::{DecodeError, FilterKind, FilterPipeline, StreamDecoder};
pub use walker::{ObjectVisitor, WalkSummary, walk_document, walk_from};

// Re-export lopdf so callers can build and inspect documents with the same version
pub use lopdf;
pub use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Errors from loading, decrypting, or saving a document.
///
/// Per-stream decoding problems are not errors at this level; see [`StreamOutcome`].
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Encrypted document: the password was rejected")]
    Encrypted,
}

pub type PdfResult<T> = std::result::Result<T, PdfError>;

// Trailer keys that only make sense on a cross-reference stream.
const XREF_STREAM_KEYS: &[&[u8]] = &[b"Type", b"Filter", b"DecodeParms", b"W", b"Index", b"Length"];

/// Decrypt `doc` with `password` if it is encrypted, so it can be written in the clear.
pub fn decrypt_if_needed(doc: &mut Document, password: &str) -> PdfResult<()> {
    if !doc.is_encrypted() {
        return Ok(());
    }

    if let Err(e) = doc.decrypt(password) {
        if let lopdf::Error::Decryption(DecryptionError::IncorrectPassword) = e {
            error!("Encrypted documents must be decrypted with a password");
            return Err(PdfError::Encrypted);
        }
        return Err(PdfError::Pdf(e));
    }

    doc.trailer.remove(b"Encrypt");
    Ok(())
}

/// Serialize `doc` without compressing anything.
///
/// Cross-reference streams are written back as a classic table so the output
/// carries no Flate data of its own.
pub fn save_uncompressed(doc: &mut Document) -> PdfResult<Vec<u8>> {
    doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
    for key in XREF_STREAM_KEYS {
        doc.trailer.remove(key);
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    debug!("Saved uncompressed document: {} bytes", buffer.len());
    Ok(buffer)
}

fn decompress_document(mut doc: Document, password: &str) -> PdfResult<Vec<u8>> {
    decrypt_if_needed(&mut doc, password)?;
    decompress_all_streams(&mut doc);
    save_uncompressed(&mut doc)
}

pub fn decompress_pdf<P: AsRef<Path>>(path: P) -> PdfResult<Vec<u8>> {
    let doc = Document::load(path)?;
    decompress_document(doc, "")
}

pub fn decompress_pdf_encrypted<P: AsRef<Path>>(path: P, password: &str) -> PdfResult<Vec<u8>> {
    let doc = Document::load(path)?;
    decompress_document(doc, password)
}

/// Load `buffer`, decompress all streams, and return the uncompressed file.
pub fn decompress_pdf_from_mem(buffer: &[u8]) -> PdfResult<Vec<u8>> {
    let doc = Document::load_mem(buffer)?;
    decompress_document(doc, "")
}

pub fn decompress_pdf_from_mem_encrypted(buffer: &[u8], password: &str) -> PdfResult<Vec<u8>> {
    let doc = Document::load_mem(buffer)?;
    decompress_document(doc, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_uncompressed_writes_classic_table() {
        let mut doc = Document::with_version("1.5");
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        let root = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(root));
        doc.trailer.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        doc.trailer.set(
            "W",
            Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(1)]),
        );
        doc.reference_table.cross_reference_type = XrefType::CrossReferenceStream;

        let bytes = save_uncompressed(&mut doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("trailer"));
        assert!(!text.contains("FlateDecode"));
        assert!(!doc.trailer.has(b"W"));
    }

    #[test]
    fn test_decrypt_if_needed_ignores_plain_documents() {
        let mut doc = Document::with_version("1.7");
        assert!(decrypt_if_needed(&mut doc, "").is_ok());
    }
}
