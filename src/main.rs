use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use gpupipesim::{config, emu, memory, sync::Arc, trace, Device};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(author, version, about = "Cycle level GPU compute unit pipeline simulator", long_about = None)]
struct Options {
    /// Program to replay on every wavefront
    #[arg(short, long, value_name = "PROGRAM")]
    program: PathBuf,
    /// GPU configuration, defaults to Southern Islands
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Use the Fermi preset when no configuration is given
    #[arg(long)]
    fermi: bool,
    /// Write statistics as JSON to this file
    #[arg(long = "stats", value_name = "STATS")]
    stats_file: Option<PathBuf>,
    /// Emit pipeline trace lines (log target `trace`)
    #[arg(long)]
    trace: bool,
    /// Verbosity, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(options: &Options) {
    let level = match options.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if options.trace {
        builder.filter_module("trace", log::LevelFilter::Trace);
    }
    builder.parse_default_env();
    builder.init();
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();
    init_logging(&options);

    let config = match &options.config {
        Some(path) => config::GPU::from_yaml(path)?,
        None if options.fermi => config::GPU::fermi(),
        None => config::GPU::southern_islands(),
    };
    config.validate()?;
    let config = Arc::new(config);

    let program = emu::Program::from_yaml(&options.program)?;
    let emulator = emu::ProgramEmulator::new(config.arch, &program)
        .wrap_err_with(|| format!("invalid program {}", options.program.display()))?;

    let mut device = Device::new(Arc::clone(&config), Box::new(emulator))
        .with_memory(memory::FixedLatency::default());
    if options.trace {
        device = device.with_sink(trace::Log::new(config.arch.trace_prefix()));
    }
    device.launch(program.kernel.clone())?;

    let start = Instant::now();
    let reason = device.run()?;
    let elapsed = start.elapsed();
    let stats = device.stats();
    eprintln!(
        "{} finished ({reason}) after {} cycles and {} instructions in {elapsed:?}",
        program.kernel, stats.cycles, stats.instructions
    );

    #[cfg(feature = "timings")]
    {
        let timings = gpupipesim::TIMINGS.lock();
        let mut timings: Vec<_> = timings.iter().collect();
        timings.sort_by_key(|(name, _)| **name);
        for (name, dur) in timings {
            eprintln!("{name:>24}: {:?} total, {:?} mean", dur.total(), dur.mean());
        }
    }

    match &options.stats_file {
        Some(path) => gpupipesim::stats::save(&stats, path)?,
        None => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(())
}
