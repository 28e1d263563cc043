use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

/// Kestrel assembler
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Source files to assemble
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (only valid with a single input)
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("KESTREL_LOG", "info")
        .write_style_or("KESTREL_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output requires exactly one input");
    }

    for input in &args.inputs {
        let src = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {input:?}"))?;
        let words = kestrel_asm::assemble(&src)
            .with_context(|| format!("failed to assemble {input:?}"))?;
        let out = args
            .output
            .clone()
            .unwrap_or_else(|| input.with_extension("out"));
        std::fs::write(&out, kestrel_asm::to_bytes(&words))
            .with_context(|| format!("failed to write {out:?}"))?;
        info!("wrote {} words to {out:?}", words.len());
    }
    Ok(())
}
