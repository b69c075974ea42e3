use std::io;
use std::num::NonZeroU64;

use log::debug;

use serde::Deserialize;

use enum_map::{enum_map, EnumMap};

use super::date::DayKey;
use super::error::Error;
use super::ioutil::csv_reader;
use super::metric::Metric;
use super::progress::ProgressSink;
use super::states::SourceOrder;


#[derive(Debug, Clone, Deserialize)]
pub struct NationalRecord {
	#[serde(rename = "data")]
	pub date: DayKey,
	#[serde(rename = "tamponi")]
	pub tests: u64,
	#[serde(rename = "totale_casi")]
	pub cases: u64,
	#[serde(rename = "deceduti")]
	pub deaths: u64,
}


/// Synthetic leading day, used to line the reference curve up with the
/// region curves at roughly the same case count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedDay {
	pub tests: u64,
	pub cases: u64,
	pub deaths: u64,
}

fn metric_values(tests: u64, cases: u64, deaths: u64) -> EnumMap<Metric, u64> {
	// the reference source has no notion of pending tests
	enum_map! {
		Metric::Tests => tests,
		Metric::TestsWithPending => tests,
		Metric::Cases => cases,
		Metric::Deaths => deaths,
	}
}


#[derive(Debug, Clone)]
pub struct ReferenceOptions {
	pub name: String,
	pub population: u64,
	pub cutoff: Option<DayKey>,
	pub order: SourceOrder,
	pub seed: Vec<SeedDay>,
}

impl Default for ReferenceOptions {
	fn default() -> Self {
		Self{
			name: "Italy".into(),
			population: 60549600,
			cutoff: None,
			order: SourceOrder::OldestFirst,
			seed: vec![
				SeedDay{tests: 0, cases: 120, deaths: 0},
				SeedDay{tests: 0, cases: 180, deaths: 0},
			],
		}
	}
}


/// Cumulative national series used as a comparison curve.
#[derive(Debug, Clone, PartialEq)]
pub struct NationalReference {
	pub name: String,
	pub population: NonZeroU64,
	/// Dates of the sourced days; seed days have none.
	pub dates: Vec<DayKey>,
	seeded: usize,
	series: EnumMap<Metric, Vec<u64>>,
}

impl NationalReference {
	pub fn latest_date(&self) -> Option<DayKey> {
		self.dates.last().copied()
	}

	/// Full series including the seed days.
	pub fn get(&self, metric: Metric) -> &[u64] {
		&self.series[metric][..]
	}

	pub fn seeded(&self) -> usize {
		self.seeded
	}

	/// Drop the most recent sourced day. Seed days are never removed.
	pub fn pop_day(&mut self) -> Option<DayKey> {
		let date = self.dates.pop()?;
		for (_, values) in self.series.iter_mut() {
			values.pop();
		}
		Some(date)
	}
}


pub fn load_reference<R: io::Read, S: ProgressSink + ?Sized>(
		s: &mut S,
		r: R,
		options: &ReferenceOptions,
) -> Result<NationalReference, Error> {
	let population = match NonZeroU64::new(options.population) {
		Some(v) => v,
		None => return Err(Error::InvalidPopulation{region: options.name.as_str().into()}),
	};

	let mut r = csv_reader(r);
	let mut dates: Vec<DayKey> = Vec::new();
	let mut series: EnumMap<Metric, Vec<u64>> = enum_map! { _ => Vec::new() };
	let mut n = 0;
	for (i, row) in r.deserialize().enumerate() {
		let rec: NationalRecord = row?;
		n = i + 1;
		match options.cutoff {
			Some(cutoff) if rec.date > cutoff => continue,
			_ => (),
		};
		if let Some(previous) = dates.last() {
			let ordered = match options.order {
				SourceOrder::OldestFirst => rec.date > *previous,
				SourceOrder::NewestFirst => rec.date < *previous,
			};
			if !ordered {
				return Err(Error::OutOfOrder{previous: *previous, found: rec.date})
			}
		}
		dates.push(rec.date);
		for (metric, v) in metric_values(rec.tests, rec.cases, rec.deaths).iter() {
			series[metric].push(*v);
		}
	}
	s.finish(n);
	if n == 0 {
		return Err(Error::NoData)
	}

	if options.order == SourceOrder::NewestFirst {
		dates.reverse();
		for (_, values) in series.iter_mut() {
			values.reverse();
		}
	}

	let seeded = options.seed.len();
	for (_, values) in series.iter_mut() {
		values.reserve(seeded);
	}
	for seed in options.seed.iter().rev() {
		for (metric, v) in metric_values(seed.tests, seed.cases, seed.deaths).iter() {
			series[metric].insert(0, *v);
		}
	}
	debug!("{}: {} days from source, {} seed days", options.name, dates.len(), seeded);

	Ok(NationalReference{
		name: options.name.clone(),
		population,
		dates,
		seeded,
		series,
	})
}
