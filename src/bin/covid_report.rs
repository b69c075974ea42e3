use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use log::{info, warn};

use covid::{
	create_with_parents, export_rankings, magic_open, write_series,
	ColumnSchema, DayKey, LoadOptions, Metric, RankingRequest, ReferenceOptions, RegionTable, Snapshot, Variant,
};


#[derive(Debug, Parser)]
#[command(about = "Load a state snapshot, rank it and export the rankings")]
struct Args {
	/// Daily per-state source, most recent day first
	#[arg(long)]
	states: PathBuf,

	/// National reference source (Italy), oldest day first
	#[arg(long)]
	italy: Option<PathBuf>,

	/// Region table `region,name,population[,area]`; built-in US table otherwise
	#[arg(long)]
	regions: Option<PathBuf>,

	/// Region overrides `region,name,population[,area]` applied on top
	#[arg(long)]
	overrides: Option<PathBuf>,

	/// Ignore everything after this date (YYYYMMDD)
	#[arg(long)]
	date: Option<DayKey>,

	/// Roll back day by day down to this date, exporting each day
	#[arg(long)]
	history_until: Option<DayKey>,

	/// Only check the columns the loader reads
	#[arg(long)]
	minimal_schema: bool,

	#[arg(long, default_value = ".")]
	out: PathBuf,
}


fn export_day(snapshot: &Snapshot, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let written = export_rankings(snapshot, out)?;
	info!("{}: wrote {} rankings", snapshot.current_date(), written.len());
	Ok(())
}

fn summarize(snapshot: &Snapshot) {
	let date = snapshot.current_date();
	for metric in Metric::RANKED.iter() {
		let rows = snapshot.ranking_table(&RankingRequest{
			metric: *metric,
			variant: Variant::Normalized,
			threshold: 1.,
		});
		if let Some(top) = rows.first() {
			info!(
				"{} {}: top is {} with {:.2} per million (+{:.2})",
				date.long_label(), metric.label(), top.region, top.value, top.delta,
			);
		}
		match snapshot.national_doubling_rate(*metric) {
			Some(rate) => info!("{}: US doubling time {:.1} days", metric.label(), rate),
			None => info!("{}: US doubling time undefined", metric.label()),
		};
		if let Some(rate) = snapshot.reference_doubling_rate(*metric) {
			info!("{}: reference doubling time {:.1} days", metric.label(), rate);
		}
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	let args = Args::parse();

	let mut regions = match args.regions.as_ref() {
		Some(path) => RegionTable::from_reader(magic_open(path)?)?,
		None => RegionTable::us_states()?,
	};
	if let Some(path) = args.overrides.as_ref() {
		let n = regions.apply_overrides(magic_open(path)?)?;
		info!("applied {} region overrides from {}", n, path.display());
	}
	let options = LoadOptions{
		cutoff: args.date,
		schema: if args.minimal_schema { ColumnSchema::minimal() } else { ColumnSchema::latest() },
		..LoadOptions::default()
	};
	let reference_options = ReferenceOptions{
		cutoff: args.date,
		..ReferenceOptions::default()
	};
	let mut snapshot = Snapshot::load(
		Arc::new(regions),
		&args.states,
		&options,
		args.italy.as_deref(),
		&reference_options,
	)?;

	summarize(&snapshot);
	export_day(&snapshot, &args.out)?;
	for metric in Metric::ALL.iter() {
		let path = args.out.join("series").join(format!("{}.csv", metric.slug()));
		write_series(create_with_parents(&path)?, &snapshot, *metric)?;
	}

	if let Some(until) = args.history_until {
		while snapshot.current_date() > until {
			if snapshot.dates().len() < 2 {
				warn!("no data before {}, stopping history", snapshot.current_date());
				break
			}
			snapshot.remove_last_day()?;
			export_day(&snapshot, &args.out)?;
		}
	}

	Ok(())
}
