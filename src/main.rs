//! motet - render composition files.
//!
//! Loads a composition (JSON or bincode) and writes the requested scores:
//! an ISiS singing-synthesis score, a Csound score and a standard MIDI file.
//! It can also print the amplitude a sine tone needs to reach a loudness.
//!
//! # Usage
//!
//! ```bash
//! motet piece.json --midi piece.mid --csound piece.sco
//! motet piece.json --isis voice.txt --render-isis voice.wav
//! motet --loudness 2 --frequency 440
//! ```
//!
//! Set `RUST_LOG=motet=debug` to see per-event fallbacks.

use anyhow::{bail, Context, Result};
use motet::converters::{
    CsoundScoreConverter, IsisConverter, IsisScoreConverter, LoudnessToAmplitudeConverter,
    MidiFileConverter, PField,
};
use motet::{Composition, SimpleEvent};
use std::path::PathBuf;

/// Command-line options for the application.
#[derive(Default)]
struct CliOptions {
    composition: Option<PathBuf>,
    isis: Option<PathBuf>,
    csound: Option<PathBuf>,
    midi: Option<PathBuf>,
    render_isis: Option<PathBuf>,
    loudness: Option<f64>,
    frequency: Option<f64>,
}

fn print_help(program: &str) {
    eprintln!("motet - event-based computer-aided composition");
    eprintln!();
    eprintln!("Usage: {} [COMPOSITION] [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --isis PATH          Write an ISiS score");
    eprintln!("  --render-isis PATH   Render the ISiS score to a sound file (needs --isis)");
    eprintln!("  --csound PATH        Write a Csound score (p4 frequency, p5 amplitude)");
    eprintln!("  --midi PATH          Write a standard MIDI file");
    eprintln!("  --loudness SONE      Print the amplitude for this loudness (needs --frequency)");
    eprintln!("  --frequency HZ       Frequency of the sine tone for --loudness");
    eprintln!("  -h, --help           Print this help message");
    eprintln!();
    eprintln!("Compositions ending in .json are read as JSON, anything else as bincode.");
}

/// Advances to the argument following the flag at `i`.
fn next_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires an argument", flag))
}

impl CliOptions {
    /// Parses command-line arguments.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("motet");
        let mut options = Self::default();
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--isis" => options.isis = Some(PathBuf::from(next_value(&args, &mut i)?)),
                "--render-isis" => options.render_isis = Some(PathBuf::from(next_value(&args, &mut i)?)),
                "--csound" => options.csound = Some(PathBuf::from(next_value(&args, &mut i)?)),
                "--midi" => options.midi = Some(PathBuf::from(next_value(&args, &mut i)?)),
                "--loudness" => {
                    let sone = next_value(&args, &mut i)?;
                    options.loudness =
                        Some(sone.parse().with_context(|| format!("invalid loudness '{}'", sone))?);
                }
                "--frequency" => {
                    let hz = next_value(&args, &mut i)?;
                    options.frequency =
                        Some(hz.parse().with_context(|| format!("invalid frequency '{}'", hz))?);
                }
                "--help" | "-h" => {
                    print_help(program);
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    bail!("unknown option: {} (use --help for usage information)", other)
                }
                other => {
                    if options.composition.is_some() {
                        bail!("more than one composition given: {}", other);
                    }
                    options.composition = Some(PathBuf::from(other));
                }
            }
            i += 1;
        }

        if options.loudness.is_some() != options.frequency.is_some() {
            bail!("--loudness and --frequency must be given together");
        }
        if options.render_isis.is_some() && options.isis.is_none() {
            bail!("--render-isis needs --isis for the score path");
        }
        Ok(options)
    }

    fn wants_scores(&self) -> bool {
        self.isis.is_some() || self.csound.is_some() || self.midi.is_some()
    }
}

/// Frequency of the first pitch as p4 and amplitude as p5.
fn csound_score_converter() -> Result<CsoundScoreConverter> {
    Ok(CsoundScoreConverter::new()
        .with_pfield(4, |event: &SimpleEvent| {
            Some(PField::Number(event.pitches()?.first()?.frequency()))
        })?
        .with_pfield(5, |event: &SimpleEvent| {
            Some(PField::Number(event.volume()?.amplitude()))
        })?)
}

fn render(cli: &CliOptions, composition: &Composition) -> Result<()> {
    let event = &composition.event;

    if let Some(score) = &cli.isis {
        let score_converter = IsisScoreConverter::new(composition.isis.clone());
        match &cli.render_isis {
            Some(output) => IsisConverter::new(score_converter)
                .convert(event, score, output)
                .context("Failed to render ISiS score")?,
            None => score_converter
                .convert(event, score)
                .context("Failed to write ISiS score")?,
        }
    }

    if let Some(score) = &cli.csound {
        csound_score_converter()?
            .convert(event, score)
            .context("Failed to write Csound score")?;
    }

    if let Some(path) = &cli.midi {
        MidiFileConverter::new(composition.midi.clone())
            .context("Invalid MIDI settings")?
            .convert(event, path)
            .context("Failed to write MIDI file")?;
    }

    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let composition = match &cli.composition {
        Some(path) => Some(
            Composition::load(path)
                .with_context(|| format!("Failed to load composition '{}'", path.display()))?,
        ),
        None => None,
    };

    if let (Some(sone), Some(frequency)) = (cli.loudness, cli.frequency) {
        let settings = composition
            .as_ref()
            .map(|c| c.loudness.clone())
            .unwrap_or_default();
        let amplitude = LoudnessToAmplitudeConverter::with_settings(sone, &settings)
            .and_then(|converter| converter.convert(frequency))
            .context("Failed to compute amplitude")?;
        println!("{}", amplitude);
    }

    if cli.wants_scores() {
        let Some(composition) = &composition else {
            bail!("no composition given (use --help for usage information)");
        };
        render(&cli, composition)?;
    } else if composition.is_none() && cli.loudness.is_none() {
        bail!("nothing to do (use --help for usage information)");
    }

    Ok(())
}
