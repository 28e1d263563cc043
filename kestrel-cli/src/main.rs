use std::path::PathBuf;

use kestrel_console::Console;
use kestrel_vm::{Exit, Vm, disasm, snapshot};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

/// Kestrel VM runner
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Program image to load and execute
    #[arg(required_unless_present = "load", conflicts_with = "load")]
    program: Option<PathBuf>,

    /// Resume from a checkpoint file instead of a program image
    #[clap(long)]
    load: Option<PathBuf>,

    /// Where to write a checkpoint when the run is interrupted
    #[clap(long, default_value = snapshot::DEFAULT_PATH)]
    dump: PathBuf,

    /// Print a disassembly of the loaded image and exit
    #[clap(long)]
    disasm: bool,

    /// Stop after this many instructions and write a checkpoint
    #[clap(long)]
    max_steps: Option<usize>,
}

/// Accepts the single-dash `-load` spelling used by older tooling
fn normalize(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|a| match a.strip_prefix("-load") {
        Some(rest) if rest.is_empty() || rest.starts_with('=') => {
            format!("--load{rest}")
        }
        _ => a,
    })
    .collect()
}

fn open(args: &Args) -> Result<Vm> {
    let vm = if let Some(path) = &args.load {
        let vm = snapshot::load(path)
            .with_context(|| format!("failed to load checkpoint {path:?}"))?;
        info!("state loaded from memory address {}", vm.pc());
        vm
    } else {
        // clap guarantees one of the two is present
        let path = args.program.as_ref().context("no program given")?;
        let rom = std::fs::read(path)
            .with_context(|| format!("failed to read {path:?}"))?;
        Vm::load(&rom).with_context(|| format!("invalid program {path:?}"))?
    };
    Ok(vm)
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("KESTREL_LOG", "info")
        .write_style_or("KESTREL_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse_from(normalize(std::env::args()));
    let mut vm = open(&args)?;

    if args.disasm {
        let words = disasm::trim_zeros(&vm.memory()[..]);
        for line in disasm::disassemble(words) {
            println!("{:5}: {line}", line.addr);
        }
        return Ok(());
    }

    let mut dev = Console::new().context("failed to install SIGINT handler")?;
    let start = std::time::Instant::now();
    let r = match args.max_steps {
        Some(n) => vm.run_until(&mut dev, |_, i| i >= n),
        None => vm.run(&mut dev),
    };
    dev.flush();
    info!("ran for {:?}", start.elapsed());

    match r.context("program faulted")? {
        Exit::Halted => Ok(()),
        Exit::Checkpoint | Exit::Paused => {
            match snapshot::save(&vm, &args.dump) {
                Ok(()) => info!("checkpoint written to {:?}", args.dump),
                Err(e) => error!("failed to write {:?}: {e}", args.dump),
            }
            std::process::exit(2);
        }
    }
}
