//! Offline maintenance for a memory store: inspect it, move records in and out as JSONL, and
//! reconcile a snapshot file taken on another machine.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mnemo_service::{ImportData, ImportMode, ImportRequest, MnemoService};

#[derive(Debug, Parser)]
#[command(
	version = mnemo_cli::VERSION,
	rename_all = "kebab",
	styles = mnemo_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print record counts, categories, and vector settings.
	Stats,
	/// Export every record as JSONL.
	Export {
		/// Write the JSONL here instead of embedding it in the printed report.
		#[arg(long, short = 'o', value_name = "FILE")]
		output: Option<PathBuf>,
	},
	/// Import records from a JSONL file.
	Import {
		#[arg(long, short = 'i', value_name = "FILE")]
		input: PathBuf,
		#[arg(long, value_enum, default_value_t = ModeArg::Merge)]
		mode: ModeArg,
	},
	/// Merge another store file into this one. Local records win on id collisions.
	Merge {
		#[arg(long, short = 's', value_name = "FILE")]
		snapshot: PathBuf,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
	Merge,
	Replace,
}
impl From<ModeArg> for ImportMode {
	fn from(mode: ModeArg) -> Self {
		match mode {
			ModeArg::Merge => Self::Merge,
			ModeArg::Replace => Self::Replace,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mnemo_config::load(&args.config)?;

	init_tracing(&config);

	let service = MnemoService::connect(config).await?;
	let report = execute(&service, args.command).await?;

	service.db.pool.close().await;

	println!("{}", serde_json::to_string_pretty(&report)?);

	Ok(())
}

/// Runs one command against an open store and returns the report to print.
pub async fn execute(service: &MnemoService, command: Command) -> color_eyre::Result<Value> {
	let report = match command {
		Command::Stats => serde_json::to_value(service.stats().await?)?,
		Command::Export { output: None } => serde_json::to_value(service.export().await?)?,
		Command::Export { output: Some(path) } => {
			let exported = service.export().await?;
			let mut data = exported.data;

			if !data.is_empty() {
				data.push('\n');
			}

			fs::write(&path, data)
				.wrap_err_with(|| format!("Failed to write {}.", path.display()))?;

			tracing::info!(path = %path.display(), count = exported.count, "Export written.");

			serde_json::json!({ "count": exported.count, "output": path })
		},
		Command::Import { input, mode } => {
			let data = read_input(&input)?;
			let mode = ImportMode::from(mode);
			let req = ImportRequest {
				data: ImportData::Jsonl(data),
				mode: Some(mode.as_str().to_string()),
			};

			serde_json::to_value(service.import(req).await?)?
		},
		Command::Merge { snapshot } =>
			serde_json::to_value(service.merge_snapshot(&snapshot).await?)?,
	};

	Ok(report)
}

fn read_input(path: &Path) -> color_eyre::Result<String> {
	match fs::read_to_string(path) {
		Ok(data) => Ok(data),
		Err(err) if err.kind() == io::ErrorKind::NotFound =>
			Err(eyre::eyre!("Import file {} does not exist.", path.display())),
		Err(err) => Err(err).wrap_err_with(|| format!("Failed to read {}.", path.display())),
	}
}

fn init_tracing(config: &mnemo_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}
