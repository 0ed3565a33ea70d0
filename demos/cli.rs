/// Reads numbers from stdin, one per line, into a histogram written to stdout, and reports on
/// histograms read back from stdin.
use std::fs;
use std::io;
use std::io::{BufRead, Read, Write};

use clap::{App, Arg, SubCommand};

use hdrpack::serialization::{
    decode_base64, encode_base64, DeserializeError, Deserializer, Serializer,
    V2DeflateSerializeError, V2DeflateSerializer, V2SerializeError, V2Serializer,
};
use hdrpack::{CountsStorage, Histogram, HistogramConfig, PackedHistogram, RecordError};

fn main() {
    let default_max = format!("{}", u64::max_value());
    let base64_arg = Arg::with_name("base64")
        .short("b")
        .long("base64")
        .help("Histograms are base64 text of the compressed encoding");
    let matches = App::new("hdrpack cli")
        .subcommand(
            SubCommand::with_name("serialize")
                .about(
                    "Transform number-per-line input from stdin \
                     into a serialized histogram on stdout",
                )
                .arg(
                    Arg::with_name("min")
                        .long("min")
                        .help("Minimum discernible value")
                        .takes_value(true)
                        .default_value("1"),
                )
                .arg(
                    Arg::with_name("max")
                        .long("max")
                        .help("Maximum trackable value")
                        .takes_value(true)
                        .default_value(default_max.as_str()),
                )
                .arg(
                    Arg::with_name("sigfig")
                        .long("sigfig")
                        .help("Number of significant digits")
                        .takes_value(true)
                        .default_value("3"),
                )
                .arg(
                    Arg::with_name("config")
                        .long("config")
                        .help("JSON histogram configuration; overrides min, max and sigfig")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("compression")
                        .short("c")
                        .long("compression")
                        .help("Enable compression"),
                )
                .arg(
                    Arg::with_name("resize")
                        .short("r")
                        .long("resize")
                        .help("Enable auto resize"),
                )
                .arg(base64_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("percentiles")
                .about("Display the percentile distribution of a serialized histogram on stdin")
                .arg(
                    Arg::with_name("ticks")
                        .short("t")
                        .long("ticks-per-half")
                        .takes_value(true)
                        .default_value("5")
                        .help("Ticks per half distance"),
                )
                .arg(
                    Arg::with_name("scale")
                        .long("scale")
                        .takes_value(true)
                        .default_value("1.0")
                        .help("Divide every reported value by this ratio"),
                )
                .arg(base64_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("summary")
                .about("Print the usual percentiles of a serialized histogram on stdin as JSON")
                .arg(base64_arg),
        )
        .get_matches();

    let stdin = std::io::stdin();
    let stdin = stdin.lock();

    let stdout = std::io::stdout();
    let stdout = stdout.lock();

    match matches.subcommand() {
        ("serialize", Some(sub_matches)) => {
            let config = match sub_matches.value_of("config") {
                Some(path) => {
                    let text = fs::read_to_string(path).expect("Config file must be readable");
                    serde_json::from_str(&text).expect("Config file must be a histogram config")
                }
                None => HistogramConfig {
                    lowest_discernible_value: sub_matches.value_of("min").unwrap().parse().unwrap(),
                    highest_trackable_value: sub_matches.value_of("max").unwrap().parse().unwrap(),
                    significant_value_digits: sub_matches
                        .value_of("sigfig")
                        .unwrap()
                        .parse()
                        .unwrap(),
                    auto_resize: sub_matches.is_present("resize"),
                },
            };

            let h: PackedHistogram = config.build().expect("Invalid histogram configuration");
            let format = if sub_matches.is_present("base64") {
                Format::Base64
            } else if sub_matches.is_present("compression") {
                Format::Compressed
            } else {
                Format::Plain
            };

            serialize(stdin, stdout, h, format)
        }
        ("percentiles", Some(sub_matches)) => {
            let ticks_per_half = sub_matches.value_of("ticks").unwrap().parse().unwrap();
            let scale = sub_matches.value_of("scale").unwrap().parse().unwrap();
            read_histogram(stdin, sub_matches.is_present("base64")).and_then(|h| {
                percentiles(&h, stdout, ticks_per_half, scale)
            })
        }
        ("summary", Some(sub_matches)) => {
            read_histogram(stdin, sub_matches.is_present("base64")).and_then(|h| summary(&h, stdout))
        }
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(2);
        }
    }
    .expect("Subcommand failed")
}

enum Format {
    Plain,
    Compressed,
    Base64,
}

/// Read numbers, one from each line, from stdin and output the resulting serialized histogram.
fn serialize<R: BufRead, W: Write, S: CountsStorage>(
    reader: R,
    mut writer: W,
    mut h: Histogram<S>,
    format: Format,
) -> Result<(), CliError> {
    for line in reader.lines() {
        let line = line?;
        let num = line
            .trim()
            .parse()
            .map_err(|_| CliError::BadInput(line.clone()))?;
        h.record(num)?;
    }

    match format {
        Format::Plain => {
            V2Serializer::new().serialize(&h, &mut writer)?;
        }
        Format::Compressed => {
            V2DeflateSerializer::new().serialize(&h, &mut writer)?;
        }
        Format::Base64 => {
            writeln!(writer, "{}", encode_base64(&h)?)?;
        }
    }

    Ok(())
}

fn read_histogram<R: Read>(mut reader: R, base64: bool) -> Result<PackedHistogram, CliError> {
    if base64 {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(decode_base64(text.trim())?)
    } else {
        Ok(Deserializer::new().deserialize(&mut reader)?)
    }
}

/// Output histogram data in the layout of the HdrHistogram percentile distribution tools.
fn percentiles<W: Write>(
    hist: &PackedHistogram,
    mut writer: W,
    ticks_per_half: u32,
    scale: f64,
) -> Result<(), CliError> {
    hist.output_percentile_distribution(&mut writer, ticks_per_half, scale)?;
    Ok(())
}

fn summary<W: Write>(hist: &PackedHistogram, mut writer: W) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(&hist.summary())?;
    writeln!(writer, "{}", text)?;
    Ok(())
}

// A handy way to enable ? use in subcommands by mapping common errors.
#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Json(serde_json::Error),
    BadInput(String),
    HistogramSerialize(V2SerializeError),
    HistogramSerializeCompressed(V2DeflateSerializeError),
    HistogramDeserialize(DeserializeError),
    HistogramRecord(RecordError),
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<V2SerializeError> for CliError {
    fn from(e: V2SerializeError) -> Self {
        CliError::HistogramSerialize(e)
    }
}

impl From<V2DeflateSerializeError> for CliError {
    fn from(e: V2DeflateSerializeError) -> Self {
        CliError::HistogramSerializeCompressed(e)
    }
}

impl From<RecordError> for CliError {
    fn from(e: RecordError) -> Self {
        CliError::HistogramRecord(e)
    }
}

impl From<DeserializeError> for CliError {
    fn from(e: DeserializeError) -> Self {
        CliError::HistogramDeserialize(e)
    }
}
