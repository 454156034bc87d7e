use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use duet_core::board::{Board, Config};
use duet_core::bus::AccessSize;
use duet_core::core::FaultPolicy;
use duet_core::image::Image;
use duet_core::simulator::{RunOutcome, Simulator};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use log::{debug, info, warn};
use stderrlog::LogLevelNum;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Memory image to execute.
    image: PathBuf,
    /// Format of the image file.
    #[arg(short, long, value_enum, default_value_t = Format::Auto)]
    format: Format,
    /// Maximum number of clock cycles to simulate.
    #[arg(short, long, default_value_t = 1_000_000)]
    cycles: u64,
    /// Raise PLIC source SOURCE once CYCLE cycles have elapsed. May be repeated.
    #[arg(long = "irq", value_name = "CYCLE:SOURCE", value_parser = parse_irq)]
    irqs: Vec<(u64, u32)>,
    /// Value presented on the switch inputs.
    #[arg(long, value_parser = parse_u32, default_value = "0")]
    switches: u32,
    /// Value presented on the push-button inputs.
    #[arg(long, default_value_t = 0)]
    buttons: u8,
    /// Size in bytes of the backing store for the external RAM region.
    #[arg(long)]
    external_ram: Option<usize>,
    /// Take an exception trap on faults instead of stopping.
    #[arg(long)]
    trap_on_fault: bool,
    /// Write the memory between the ELF symbols `begin_signature` and `end_signature` to this
    /// file, one word per line.
    #[arg(long, short)]
    signature: Option<PathBuf>,
    /// Increase log verbosity. May be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
enum Format {
    /// ELF if the file starts with the ELF magic, otherwise detect hex or raw binary.
    Auto,
    Bin,
    Hex,
    Elf,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let verbosity = match args.verbose {
        0 => LogLevelNum::Warn,
        1 => LogLevelNum::Info,
        2 => LogLevelNum::Debug,
        _ => LogLevelNum::Trace,
    };
    stderrlog::new()
        .verbosity(verbosity)
        .modules([module_path!(), "duet_core"])
        .init()
        .map_err(io::Error::other)?;

    let mut buf = Vec::new();
    File::open(&args.image)?.read_to_end(&mut buf)?;

    let format = match args.format {
        Format::Auto if buf.starts_with(b"\x7fELF") => Format::Elf,
        format => format,
    };
    let elf = match format {
        Format::Elf => Some(Elf::parse(&buf).map_err(invalid_data)?),
        _ => None,
    };

    let mut config = Config {
        external_ram_size: args.external_ram,
        ..Config::default()
    };
    if args.trap_on_fault {
        config.core.fault_policy = FaultPolicy::Trap;
    }
    match (&elf, format) {
        (Some(elf), _) => config.core.reset_vector = elf.entry as u32,
        (None, Format::Hex) => {
            let text = std::str::from_utf8(&buf).map_err(invalid_data)?;
            config.image = Image::parse_hex(text).map_err(invalid_data)?;
        }
        (None, Format::Bin) => config.image = Image::from_binary(buf.as_slice()),
        (None, _) => config.image = Image::detect(&buf),
    }

    let mut board = Board::new(config).map_err(invalid_input)?;
    if let Some(elf) = &elf {
        load_elf(&mut board, elf, &buf)?;
    }

    let mut simulator = Simulator::new(board);
    simulator.set_switches(args.switches);
    simulator.set_push_buttons(args.buttons);

    let outcome = run(&mut simulator, args.cycles, args.irqs);

    let mut stdout = io::stdout().lock();
    for word in simulator.take_debug_output() {
        writeln!(stdout, "0x{word:08x}")?;
    }

    if let Some(path) = &args.signature {
        let elf = elf.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "signature requires an ELF image")
        })?;
        write_signature(&simulator, elf, path)?;
    }

    match outcome {
        RunOutcome::Halted { .. } => match simulator.fault() {
            Some(fault) => Err(io::Error::other(fault)),
            None => {
                info!("halted after {} cycles", simulator.cycles());
                Ok(())
            }
        },
        RunOutcome::BudgetExhausted => {
            warn!("cycle budget of {} exhausted", args.cycles);
            Ok(())
        }
    }
}

/// Run for at most `budget` cycles, raising each interrupt source once its cycle is reached.
fn run(simulator: &mut Simulator<Board>, budget: u64, mut irqs: Vec<(u64, u32)>) -> RunOutcome {
    irqs.sort_unstable();
    for (cycle, source) in irqs {
        if cycle > budget {
            break;
        }
        simulator.step(cycle.saturating_sub(simulator.cycles()));
        if simulator.is_halted() {
            return RunOutcome::Halted {
                cycles: simulator.cycles(),
            };
        }
        debug!(cycle = cycle, source = source; "raising interrupt");
        simulator.inject_interrupt(source);
    }
    match simulator.run(budget.saturating_sub(simulator.cycles())) {
        RunOutcome::Halted { .. } => RunOutcome::Halted {
            cycles: simulator.cycles(),
        },
        outcome => outcome,
    }
}

fn load_elf(board: &mut Board, elf: &Elf, buf: &[u8]) -> io::Result<()> {
    for header in elf
        .program_headers
        .iter()
        .filter(|header| header.p_type == PT_LOAD)
    {
        let bytes = buf.get(header.file_range()).ok_or_else(|| {
            invalid_data(format!("segment at {:#x} lies outside the file", header.p_paddr))
        })?;
        board
            .load_physical(header.p_paddr as u32, bytes)
            .map_err(invalid_input)?;
    }
    Ok(())
}

fn write_signature(simulator: &Simulator<Board>, elf: &Elf, path: &Path) -> io::Result<()> {
    let mut signature_start = None;
    let mut signature_end = None;
    for sym in elf.syms.iter() {
        let Some(name) = elf.strtab.get_at(sym.st_name) else {
            continue;
        };
        if name == "begin_signature" {
            signature_start = Some(sym.st_value as u32);
        } else if name == "end_signature" {
            signature_end = Some(sym.st_value as u32);
        }
    }
    let (Some(start), Some(end)) = (signature_start, signature_end) else {
        return Err(invalid_data("missing `begin_signature` or `end_signature` symbol"));
    };
    if start % 4 != 0 || end % 4 != 0 || start > end {
        return Err(invalid_data(format!(
            "invalid signature bounds {start:#010x}..{end:#010x}"
        )));
    }

    let mut file = File::create(path)?;
    for address in (start..end).step_by(4) {
        let word = simulator
            .read_memory(address, AccessSize::Word)
            .map_err(invalid_data)?;
        writeln!(file, "{word:08x}")?;
    }
    Ok(())
}

fn parse_irq(value: &str) -> Result<(u64, u32), String> {
    let (cycle, source) = value
        .split_once(':')
        .ok_or_else(|| format!("expected CYCLE:SOURCE, got {value:?}"))?;
    let cycle = cycle
        .parse::<u64>()
        .map_err(|err| format!("invalid cycle {cycle:?}: {err}"))?;
    let source = parse_u32(source)?;
    Ok((cycle, source))
}

fn parse_u32(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|err| format!("invalid number {value:?}: {err}"))
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

fn invalid_input<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidInput, error)
}
