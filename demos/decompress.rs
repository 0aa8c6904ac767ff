//! Write an uncompressed copy of a PDF.
//!
//! Usage: cargo run --example decompress -- <input.pdf> <output.pdf> [password]

use log::{LevelFilter, error, info};
use pdf_decompress::{Document, decompress_all_streams, decrypt_if_needed, save_uncompressed};
use simple_logger::SimpleLogger;
use std::{env, fs, process};

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .expect("logger installs once");

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <input.pdf> <output.pdf> [password]", args[0]);
        process::exit(2);
    }

    let mut doc = match Document::load(&args[1]) {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to load {}: {}", args[1], e);
            process::exit(1);
        }
    };

    let password = args.get(3).map(String::as_str).unwrap_or("");
    if let Err(e) = decrypt_if_needed(&mut doc, password) {
        error!("Failed to decrypt {}: {}", args[1], e);
        process::exit(1);
    }

    let report = decompress_all_streams(&mut doc);
    if report.streams_failed > 0 {
        info!("{} streams could not be decoded and were kept as is", report.streams_failed);
    }

    let bytes = match save_uncompressed(&mut doc) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to serialize: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = fs::write(&args[2], &bytes) {
        error!("Failed to write {}: {}", args[2], e);
        process::exit(1);
    }
    info!("Wrote {} ({} bytes)", args[2], bytes.len());
}
