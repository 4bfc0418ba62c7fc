//! `gbc-blocks`: per-subroutine Block/Group tree, annotated with jump
//! topology.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gbc_decompiler::Decoder;

#[derive(Parser)]
#[command(about = "Dump the recovered block tree for every subroutine")]
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

    print!("{}", gbc_decompiler::emit::blocks(&decoder));
    Ok(())
}
