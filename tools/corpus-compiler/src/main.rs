use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use glossa_protocol::TokenCorpus;
use rkyv::ser::{serializers::AllocSerializer, Serializer};

#[derive(Parser)]
#[command(author, version, about = "Compiles a JSON token corpus to rkyv binary")]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    println!("📖 Reading JSON from {:?}...", cli.input);
    let input_data = fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read {:?}", cli.input))?;

    let corpus: TokenCorpus = serde_json::from_str(&input_data)?;
    validate(&corpus)?;

    println!(
        "⚙️  Compiling corpus {} v{} with {} tokens...",
        corpus.book,
        corpus.version,
        corpus.tokens.len()
    );

    let mut serializer = AllocSerializer::<256>::default();
    serializer
        .serialize_value(&corpus)
        .expect("Failed to rkyv serialize");
    let bytes = serializer.into_serializer().into_inner();

    // Runtime loads assume validated input, so check the archive now.
    rkyv::check_archived_root::<TokenCorpus>(&bytes)
        .map_err(|e| anyhow::anyhow!("archive self-check failed: {e}"))?;

    fs::write(&cli.output, &bytes)?;

    println!("✅ Success! {} bytes written to {:?}", bytes.len(), cli.output);
    Ok(())
}

/// The quote matcher depends on id order following reading order; reject a
/// corpus that breaks it rather than compiling a broken artifact.
fn validate(corpus: &TokenCorpus) -> anyhow::Result<()> {
    if corpus.tokens.is_empty() {
        bail!("corpus {} has no tokens", corpus.book);
    }
    for pair in corpus.tokens.windows(2) {
        if pair[1].id <= pair[0].id {
            bail!(
                "token ids out of order at {} (after {})",
                pair[1].id.0,
                pair[0].id.0
            );
        }
    }
    for token in &corpus.tokens {
        if token.verse.chapter == 0 || token.verse.verse == 0 {
            bail!("token {} has a zeroed verse reference", token.id.0);
        }
    }
    Ok(())
}
