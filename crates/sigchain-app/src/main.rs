//! sigchain - signal chain host
//!
//! Builds, runs, and persists signal chains made of the built-in units, and
//! inspects spectra with the FFT utility.

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sigchain_dsp::{Complex64, SpectralTransform, Window};
use sigchain_engine::builtin::constant::ConstantProcessor;
use sigchain_engine::builtin::mixer::MixerProcessor;
use sigchain_engine::{
    AudioUnit, BuiltinFactory, PortAddress, Session, SignalChain, UnitFactory, UnitId,
};

/// Signal chain host
#[derive(Parser, Debug)]
#[command(name = "sigchain")]
#[command(about = "Run signal chains and inspect spectra", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a small chain (constants -> amplifier -> mixer) and run it
    Demo {
        /// Number of cycles to run
        #[arg(short, long, default_value_t = 4)]
        cycles: usize,

        /// Save the demo chain as a session file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Load a session file and run every unit in it
    Run {
        /// Session file (.ron)
        session: PathBuf,

        /// Number of cycles to run
        #[arg(short, long, default_value_t = 1)]
        cycles: usize,
    },

    /// Transform a synthesized sine and print its magnitude spectrum
    Spectrum {
        /// Transform length (power of two)
        #[arg(short, long, default_value_t = 64)]
        size: usize,

        /// Frequency bin of the sine
        #[arg(short, long, default_value_t = 4)]
        bin: usize,

        /// Window: none, hann, hamming, blackman
        #[arg(short, long, default_value = "hann")]
        window: Window,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sigchain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Demo { cycles, save } => run_demo(cycles, save),
        Command::Run { session, cycles } => run_session(&session, cycles),
        Command::Spectrum { size, bin, window } => print_spectrum(size, bin, window),
    }
}

/// Build the demo chain, returning it with the id of the final mixer
fn build_demo_chain() -> Result<(SignalChain, UnitId)> {
    let factory = BuiltinFactory;
    let mut chain = SignalChain::new();

    let source = chain.add_audio_unit(AudioUnit::new(Box::new(ConstantProcessor::new(2.0))));
    let gain = chain.add_audio_unit(AudioUnit::new(Box::new(ConstantProcessor::new(3.0))));
    let amp = chain.add_audio_unit(
        factory
            .create("sigchain.builtin.amplifier")
            .context("Amplifier unit is not available")?,
    );

    let mut mixer = MixerProcessor::default();
    mixer.set_gains(1.0, 1.0, 0.5);
    let mix = chain.add_audio_unit(AudioUnit::new(Box::new(mixer)));

    chain.connect(PortAddress::output(source, 0), PortAddress::input(amp, 0))?;
    chain.connect(PortAddress::output(gain, 0), PortAddress::input(amp, 1))?;
    chain.connect(PortAddress::output(amp, 0), PortAddress::input(mix, 0))?;
    chain.connect(PortAddress::output(source, 0), PortAddress::input(mix, 1))?;

    Ok((chain, mix))
}

fn run_demo(cycles: usize, save: Option<PathBuf>) -> Result<()> {
    let (mut chain, mix) = build_demo_chain()?;

    let order = chain.dependency_order(mix);
    tracing::info!("Update order: {:?}", order);

    chain.start().context("Failed to start demo chain")?;
    for cycle in 0..cycles {
        chain.run_cycle(&[mix]);
        println!("cycle {cycle}: mixer out = {}", chain.output_value(mix, 0)?);
    }
    chain.stop();

    if let Some(path) = save {
        Session::from_chain(&chain, "demo")?
            .save(&path)
            .with_context(|| format!("Failed to save session to {}", path.display()))?;
        println!("Saved session to {}", path.display());
    }

    Ok(())
}

fn run_session(path: &Path, cycles: usize) -> Result<()> {
    let session = Session::load(path)
        .with_context(|| format!("Failed to load session {}", path.display()))?;
    let mut chain = session
        .to_chain(&BuiltinFactory)
        .context("Failed to rebuild signal chain")?;

    println!(
        "Session '{}': {} units, {} connections",
        session.name,
        chain.len(),
        chain.connections().len()
    );

    chain.start().context("Failed to start signal chain")?;
    for _ in 0..cycles {
        chain.run_cycle_all();
    }

    for unit in chain.units() {
        let Some(id) = unit.id() else {
            continue;
        };
        println!("{id} {}", unit.info().name);
        for output in unit.outputs() {
            println!("    {} = {}", output.name(), output.value());
        }
    }

    chain.stop();
    Ok(())
}

fn print_spectrum(size: usize, bin: usize, window: Window) -> Result<()> {
    ensure!(size.is_power_of_two(), "size must be a power of two, got {size}");
    if bin >= size / 2 {
        bail!("bin must be below {}, got {bin}", size / 2);
    }

    let mut buffer: Vec<Complex64> = (0..size)
        .map(|i| {
            let phase = std::f64::consts::TAU * (bin * i) as f64 / size as f64;
            Complex64::new(phase.sin(), 0.0)
        })
        .collect();

    SpectralTransform::forward(&mut buffer, window);
    let magnitudes = SpectralTransform::magnitudes(&buffer);

    println!("{size}-point spectrum, {window} window:");
    for (k, magnitude) in magnitudes.iter().take(size / 2).enumerate() {
        let bar = "#".repeat((magnitude * 8.0).round() as usize);
        println!("{k:4} {magnitude:8.4} {bar}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigchain_engine::Value;

    #[test]
    fn test_demo_chain_output() {
        let (mut chain, mix) = build_demo_chain().unwrap();
        chain.start().unwrap();
        chain.run_cycle(&[mix]);

        // (2.0 * 3.0 + 2.0) * 0.5
        assert_eq!(chain.output_value(mix, 0).unwrap(), Value::Double(4.0));
    }

    #[test]
    fn test_spectrum_rejects_bad_sizes() {
        assert!(print_spectrum(48, 2, Window::None).is_err());
        assert!(print_spectrum(16, 8, Window::None).is_err());
        assert!(print_spectrum(16, 2, Window::Hann).is_ok());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["sigchain", "spectrum", "--window", "blackman"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Spectrum {
                size: 64,
                window: Window::Blackman,
                ..
            }
        ));
    }
}
