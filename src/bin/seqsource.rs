use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;
use seqsource::config::OneOrMany;
use seqsource::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use seqsource::mongo::Document;
use seqsource::{read_input, InputParams, InputSource, SequenceInput};
use serde_json::Value;
use tracing::error;

/// seqsource CLI
#[derive(Parser)]
#[command(name = "seqsource")]
#[command(version)]
#[command(about = "Read sequence records from FASTA, JSON Lines or MongoDB", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count records without holding them in memory
    Count {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the first records as JSON Lines
    Head {
        #[command(flatten)]
        source: SourceArgs,
        /// Number of records to print
        #[arg(short = 'n', long, default_value_t = 10)]
        n: usize,
    },

    /// Load every record and print an id/length table
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Read the source described by a TOML parameter file
    FromConfig {
        /// Parameter file (keys as in InputParams)
        config: PathBuf,
        /// Print the summary table instead of the count
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Data type: fasta, json or mongodb
    #[arg(short = 't', long)]
    data_type: String,

    /// Files or directories (fasta/json), or the database name (mongodb)
    #[arg(required = true)]
    input: Vec<String>,

    /// Collection to read; repeatable. Every non-system collection when omitted
    #[arg(short, long = "collection")]
    collections: Vec<String>,

    #[arg(long, env = "SEQSOURCE_MONGO_HOST", default_value = "localhost")]
    mongo_ip: String,

    #[arg(long, env = "SEQSOURCE_MONGO_PORT", default_value_t = 27017)]
    mongo_port: u16,

    #[arg(long, env = "SEQSOURCE_MONGO_USER")]
    mongo_user: Option<String>,

    #[arg(long, env = "SEQSOURCE_MONGO_PASSWORD", hide_env_values = true)]
    mongo_password: Option<String>,

    /// Filter as a JSON object, e.g. '{"isotype": "IgG"}'
    #[arg(long)]
    query: Option<String>,

    /// Projection as a JSON object, e.g. '{"seq_id": 1, "vdj_nt": 1}'
    #[arg(long)]
    projection: Option<String>,

    /// Only collections whose name starts with this
    #[arg(long)]
    collection_prefix: Option<String>,

    /// Only collections whose name ends with this
    #[arg(long)]
    collection_suffix: Option<String>,

    /// Extension selecting files when a FASTA input is a directory
    #[arg(long)]
    extension: Option<String>,
}

impl SourceArgs {
    fn into_params(self) -> Result<InputParams> {
        let mut params = InputParams::new(self.data_type, self.input);
        if !self.collections.is_empty() {
            params.collections = Some(OneOrMany::Many(self.collections));
        }
        params.mongo_ip = self.mongo_ip;
        params.mongo_port = self.mongo_port;
        params.mongo_user = self.mongo_user;
        params.mongo_password = self.mongo_password;
        params.query = self.query.as_deref().map(|q| json_object(q, "--query")).transpose()?;
        params.projection = self.projection.as_deref().map(|p| json_object(p, "--projection")).transpose()?;
        params.collection_prefix = self.collection_prefix;
        params.collection_suffix = self.collection_suffix;
        params.extension = self.extension;
        Ok(params)
    }
}

fn json_object(text: &str, flag: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(text).with_context(|| format!("{flag} is not valid JSON"))? {
        Value::Object(map) => Ok(map),
        _ => bail!("{flag} must be a JSON object"),
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = match log_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    };
    // The CLI still works without a subscriber.
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    if let Err(e) = execute_command(cli.command) {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Flags set the baseline; `SEQSOURCE_LOG*` variables override it.
fn log_config(cli: &Cli) -> Result<LogConfig> {
    let mut config = LogConfig {
        level: match cli.verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        },
        ..LogConfig::default()
    };
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    config.merge_env()
}

fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Count { source } => cmd_count(&read_input(source.into_params()?)?),
        Commands::Head { source, n } => cmd_head(&read_input(source.into_params()?)?, n),
        Commands::Summary { source } => cmd_summary(&read_input(source.into_params()?)?),
        Commands::FromConfig { config, summary } => {
            let params = InputParams::from_toml_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let input = read_input(params)?;
            if summary {
                cmd_summary(&input)
            } else {
                cmd_count(&input)
            }
        }
    }
}

fn cmd_count(input: &InputSource) -> Result<()> {
    let mut n = 0usize;
    for record in input.as_generator() {
        record?;
        n += 1;
    }
    println!("{n}");
    Ok(())
}

fn cmd_head(input: &InputSource, n: usize) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in input.as_generator().take(n) {
        serde_json::to_writer(&mut out, &record?)?;
        writeln!(out)?;
    }
    Ok(())
}

fn cmd_summary(input: &InputSource) -> Result<()> {
    let records = input.as_list()?;

    let ids: Vec<Option<String>> = records.iter().map(|r| r.id().map(str::to_string)).collect();
    let lengths: Vec<u64> = records.iter().map(|r| r.len() as u64).collect();
    let fields: Vec<u64> = records.iter().map(|r| r.fields().len() as u64).collect();

    let df = df!(
        "id" => ids,
        "length" => lengths,
        "fields" => fields,
    )?;

    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");

    println!("{} ({} records)", input.data_type(), records.len());
    println!("{}", df);
    Ok(())
}
