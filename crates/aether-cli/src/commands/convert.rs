//! `aether convert`: canonical document JSON in, TOON encoding out.

use crate::cli::{ConvertArgs, OutputFormat};
use aether_core::Document;
use aether_core::toon::{self, ToonDocument};
use anyhow::{Context, Result};
use std::io::{Read, Write};
use tokio_util::sync::CancellationToken;

pub fn run(args: &ConvertArgs) -> Result<()> {
    let raw = if args.input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading document from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("reading {}", args.input))?
    };

    let document: Document =
        serde_json::from_str(&raw).context("parsing canonical document JSON")?;
    let toon = ToonDocument::from_document(&document).context("building toon document")?;

    let ctx = CancellationToken::new();
    emit(&ctx, &toon, args.format)
}

/// Writes one TOON document to stdout in the requested encoding.
pub fn emit(ctx: &CancellationToken, toon: &ToonDocument, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", toon::to_json_pretty(toon)?),
        OutputFormat::Lite => println!("{}", toon::to_lite_json(toon)?),
        OutputFormat::Bton => {
            let bytes = toon::encode(toon);
            std::io::stdout()
                .write_all(&bytes)
                .context("writing bton to stdout")?;
        },
        OutputFormat::Jsonl => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            toon::stream(ctx, toon, &mut lock)?;
        },
    }
    Ok(())
}
