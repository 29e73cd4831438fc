mod report;

use pali_morph::{Analyzer, Layer, Options, ParsingType, Settings, sample};
use std::io::{self, IsTerminal};

const DEFAULT_DEPTH: usize = 4;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let analysis = Analyzer::new(sample::corpus(), settings).and_then(|analyzer| {
        let mut options = Options { parsing_type: config.parsing_type, ..Options::default() }.with_depth(config.depth);
        options.layer = config.layer;
        analyzer.analyze(&config.word, &options)
    });

    match analysis {
        Ok(analysis) => report::print_analysis(&analysis, config.color, config.parsing_type == ParsingType::Debug),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

struct CliConfig {
    word: String,
    parsing_type: ParsingType,
    depth: usize,
    layer: Option<Layer>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut word: Option<String> = None;
    let mut parsing_type = ParsingType::Release;
    let mut depth = DEFAULT_DEPTH;
    let mut layer = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("pali-morph {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--debug" => parsing_type = ParsingType::Debug,
            "--import" => parsing_type = ParsingType::Import,
            "--depth" => {
                let value = args.next().ok_or_else(|| "error: --depth expects a value".to_string())?;
                depth = parse_depth(&value)?;
            }
            "--layer" => {
                let value = args.next().ok_or_else(|| "error: --layer expects a value".to_string())?;
                layer = Some(parse_layer(&value)?);
            }
            "--" => {
                let rest: Vec<String> = args.collect();
                set_word(&mut word, rest)?;
                break;
            }
            _ if arg.starts_with("--depth=") => depth = parse_depth(arg.trim_start_matches("--depth="))?,
            _ if arg.starts_with("--layer=") => layer = Some(parse_layer(arg.trim_start_matches("--layer="))?),
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => set_word(&mut word, vec![arg])?,
        }
    }

    let Some(word) = word else {
        return Err(format!("error: no word provided\n\n{}", help_text()));
    };

    Ok(CliConfig { word, parsing_type, depth, layer, color })
}

fn set_word(word: &mut Option<String>, values: Vec<String>) -> Result<(), String> {
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if word.is_some() {
            return Err("error: exactly one word is analyzed per run".to_string());
        }
        *word = Some(value.to_string());
    }
    Ok(())
}

fn parse_depth(value: &str) -> Result<usize, String> {
    value.parse().map_err(|_| format!("error: invalid --depth '{value}' (expected a non-negative integer)"))
}

fn parse_layer(value: &str) -> Result<Layer, String> {
    let number: u8 = value.parse().map_err(|_| format!("error: invalid --layer '{value}' (expected 1..=8)"))?;
    Layer::new(number).map_err(|err| format!("error: {err}"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "pali-morph {version}

Morphological analysis of a single Pali word against the built-in corpus.

Usage:
  pali-morph [OPTIONS] [--] <word>

Options:
  --debug                    Keep error-tagged branches and print per-stage counts.
  --import                   Clean trees in derivation order (no ranking).
  --depth <n>                Maximum derivation depth. Default: {default_depth}
  --layer <n>                Chronological layer 1..=8 for ratings.
                             Default: the layer where the word is most frequent.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  PALI_MORPH_DEFAULT_LAYER   Layer used when the word occurs in no layer.
  PALI_MORPH_ROOT_TERM       slot:value marking root morphemes (default 14:1).
  RUST_LOG                   Log filter, e.g. pali_morph=debug.

Exit codes:
  0  Success.
  1  Analysis failed.
  2  Invalid arguments, settings or missing word.
",
        version = env!("CARGO_PKG_VERSION"),
        default_depth = DEFAULT_DEPTH
    )
}
