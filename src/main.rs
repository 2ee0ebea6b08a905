//! meterkit - print rhythmic indispensability arrays for meter expressions.
//!
//! # Usage
//!
//! ```bash
//! meterkit "(2+3+2)*3"            # ranks for a 6/8 + 9/8 + 6/8 bar
//! meterkit -n "2+3" "3+2"         # normalized, several meters at once
//! meterkit --barlow "2*2*3"       # Barlow's original values for 2x2x3 strata
//! meterkit -s -j "(2+2)+3"        # JSON with structure and beat groups
//! ```
//!
//! Set `RUST_LOG=meterkit=debug` to see the pipeline on stderr.

use anyhow::{bail, Context, Result};
use meterkit::meter::{
    barlow_style_indispensability_array, indispensability_array_from_expression,
    strata_to_expression, BeatTree, IndispensabilityArray, IndispensabilityOptions,
    MetricStructure, Stratum,
};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

/// Command-line options for the application.
struct CliOptions {
    /// Meter expressions (or `*`-separated strata in Barlow mode).
    expressions: Vec<String>,
    /// Path to a JSON options file, applied before the flags below.
    config: Option<PathBuf>,
    normalize: bool,
    break_up: bool,
    /// Disable ranking pickups ahead of group length.
    literal: bool,
    /// Treat every expression as integer strata and use Barlow's rules.
    barlow: bool,
    /// Also print the structure and nested beat groups.
    show_structure: bool,
    json: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--normalize` or `-n`: scale to 0..1
    /// - `--break-up` or `-b`: split groups above 3 into 2s and 3s
    /// - `--literal` or `-l`: Barlow's ordering for uneven groups
    /// - `--barlow`: integer strata, Barlow's original values
    /// - `--structure` or `-s`: print the metric structure too
    /// - `--json` or `-j`: machine-readable output
    /// - `--config <path>` or `-c <path>`: load options from JSON
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            expressions: Vec::new(),
            config: None,
            normalize: false,
            break_up: false,
            literal: false,
            barlow: false,
            show_structure: false,
            json: false,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--normalize" | "-n" => options.normalize = true,
                "--break-up" | "-b" => options.break_up = true,
                "--literal" | "-l" => options.literal = true,
                "--barlow" => options.barlow = true,
                "--structure" | "-s" => options.show_structure = true,
                "--json" | "-j" => options.json = true,
                "--config" | "-c" => {
                    i += 1;
                    let Some(path) = args.get(i) else {
                        bail!("--config requires a path argument");
                    };
                    options.config = Some(PathBuf::from(path));
                }
                "--help" | "-h" => {
                    print_help(args.first().map(String::as_str).unwrap_or("meterkit"));
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => {
                    bail!("Unknown option: {}\nUse --help for usage information", flag);
                }
                expression => options.expressions.push(expression.to_string()),
            }
            i += 1;
        }

        if options.expressions.is_empty() {
            bail!("no meter expression given\nUse --help for usage information");
        }
        Ok(options)
    }

    /// Loads the config file (if any) and applies the command-line flags on top.
    fn indispensability_options(&self) -> Result<IndispensabilityOptions> {
        let mut options = match &self.config {
            Some(path) => IndispensabilityOptions::load_from_file(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => IndispensabilityOptions::default(),
        };
        if self.normalize {
            options.normalize = true;
        }
        if self.break_up {
            options.break_up_large_numbers = true;
        }
        if self.literal {
            options.upbeats_before_group_length = false;
        }
        Ok(options)
    }
}

fn print_help(program: &str) {
    eprintln!("meterkit - rhythmic indispensability for nested meters");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] <EXPRESSION>...", program);
    eprintln!();
    eprintln!("Expressions use integers, '+', '*' and parentheses, e.g. \"(2+3+2)*3\".");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -n, --normalize     Scale indispensabilities to the range 0..1");
    eprintln!("  -b, --break-up      Split groups larger than 3 into 2s and 3s");
    eprintln!("  -l, --literal       Order pulses of uneven groups as Barlow did");
    eprintln!("      --barlow        Read expressions as integer strata (e.g. 2*2*3)");
    eprintln!("                      and reproduce Barlow's original values");
    eprintln!("  -s, --structure     Also print the metric structure and beat groups");
    eprintln!("  -j, --json          Print one JSON document instead of text");
    eprintln!("  -c, --config PATH   Load options from a JSON file before applying flags");
    eprintln!("  -h, --help          Print this help message");
}

/// Result for one expression.
#[derive(Debug, Serialize)]
struct Report {
    expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<MetricStructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beat_groups: Option<BeatTree>,
    indispensability: IndispensabilityArray,
}

/// Reads `2*(2+3)*3`-style strata for Barlow mode.
fn parse_strata(expression: &str) -> Result<Vec<Stratum>> {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split('*')
        .map(|part| {
            if let Some(inner) = part.strip_prefix('(').and_then(|p| p.strip_suffix(')')) {
                let groups = inner
                    .split('+')
                    .map(|g| g.parse::<u32>().with_context(|| format!("bad group '{}' in '{}'", g, expression)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Stratum::Additive(groups))
            } else {
                let count = part
                    .parse::<u32>()
                    .with_context(|| format!("bad stratum '{}' in '{}'", part, expression))?;
                Ok(Stratum::Even(count))
            }
        })
        .collect()
}

fn evaluate(expression: &str, cli: &CliOptions, options: &IndispensabilityOptions) -> Result<Report> {
    let (indispensability, structure) = if cli.barlow {
        let strata = parse_strata(expression)?;
        let array = barlow_style_indispensability_array(strata.iter().cloned(), options.normalize)
            .with_context(|| format!("Failed to evaluate '{}'", expression))?;
        let structure = if cli.show_structure {
            Some(MetricStructure::from_string(&strata_to_expression(&strata), true)?)
        } else {
            None
        };
        (array, structure)
    } else {
        let array = indispensability_array_from_expression(expression, options)
            .with_context(|| format!("Failed to evaluate '{}'", expression))?;
        let structure = if cli.show_structure {
            Some(MetricStructure::from_string(expression, options.break_up_large_numbers)?)
        } else {
            None
        };
        (array, structure)
    };

    let beat_groups = structure.as_ref().map(MetricStructure::get_nested_beat_groups);
    Ok(Report {
        expression: expression.to_string(),
        structure,
        beat_groups,
        indispensability,
    })
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = cli.indispensability_options()?;
    tracing::debug!(?options, expressions = cli.expressions.len(), "evaluating");

    // Output order follows input order; the first failure aborts.
    let reports = cli
        .expressions
        .par_iter()
        .map(|expression| evaluate(expression, &cli, &options))
        .collect::<Result<Vec<_>>>()?;

    if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialize output")?;
        println!("{}", json);
        return Ok(());
    }

    for report in &reports {
        println!("{}: {}", report.expression, report.indispensability);
        if let Some(structure) = &report.structure {
            println!("  structure:   {}", structure);
        }
        if let Some(beat_groups) = &report.beat_groups {
            println!(
                "  beat groups: {}",
                serde_json::to_string(beat_groups).context("Failed to serialize beat groups")?
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strata() {
        assert_eq!(
            parse_strata("2 * (2+3) * 3").unwrap(),
            vec![Stratum::Even(2), Stratum::Additive(vec![2, 3]), Stratum::Even(3)]
        );
        assert!(parse_strata("2*x").is_err());
    }
}
