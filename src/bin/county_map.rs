use std::path::PathBuf;

use clap::Parser;

use log::info;

use covid::{
	create_with_parents, default_output, load_county_day, magic_open, redistribute, write_county_values,
	CountyMetric, CountyTable, DayKey, GeoConfig, Outcome,
};


#[derive(Debug, Parser)]
#[command(about = "Compute county values for the choropleth maps")]
struct Args {
	/// Census GCT-PH1 county table
	#[arg(long)]
	census: PathBuf,

	/// Daily county source, oldest day first
	#[arg(long)]
	counties: PathBuf,

	/// Day to process; the most recent day otherwise
	#[arg(long)]
	date: Option<DayKey>,

	/// Output CSV
	#[arg(long, default_value = "county-data.csv")]
	out: PathBuf,
}


fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	let args = Args::parse();
	let config = GeoConfig::default();

	let table = CountyTable::from_census(magic_open(&args.census)?, &config)?;
	let mut progress = default_output("counties");
	let mut day = load_county_day(&mut *progress, magic_open(&args.counties)?, &table, &config, args.date)?;

	let distributions = redistribute(&mut day, &table, &config);
	let dropped = distributions.iter().filter(|d| d.outcome == Outcome::Dropped).count();
	info!("{}: {} unknown counts distributed, {} dropped", day.date, distributions.len() - dropped, dropped);

	for metric in CountyMetric::ALL.iter() {
		info!(
			"{} {}: US total {}, {:.0} after redistribution, max {:.1} per {} sq mi",
			day.date, metric.slug(), day.us_totals[*metric], day.total(*metric), day.max_per_area[*metric], config.area_scale,
		);
	}

	write_county_values(create_with_parents(&args.out)?, &day, &table, config.area_scale)?;
	Ok(())
}
