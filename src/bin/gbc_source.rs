//! `gbc-source`: full segmented decompiled source listing.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gbc_decompiler::Decoder;

#[derive(Parser)]
#[command(about = "Decompile a GBC bytecode file into C-like source")]
struct Args {
    /// Path to a compiled GBC bytecode file.
    file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let data = fs::read(&args.file)?;

    let mut decoder = Decoder::new(&data);
    if let Err(err) = decoder.full_decode() {
        tracing::error!(error = %err, "decode failed; printing whatever was recovered");
    }
    decoder.combo_decode();
    decoder.init_decode();

    print!("{}", gbc_decompiler::emit::source(&decoder));
    Ok(())
}
