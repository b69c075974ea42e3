use std::collections::HashSet;
use std::io;

use log::{debug, error, warn};

use serde::Deserialize;

use enum_map::{enum_map, EnumMap};

use super::date::DayKey;
use super::error::Error;
use super::ioutil::csv_reader;
use super::metric::Metric;
use super::progress::ProgressSink;
use super::regions::{RegionId, RegionTable};
use super::timeseries::{Sample, Samples};


/// Order in which a source lists its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrder {
	NewestFirst,
	OldestFirst,
}

impl SourceOrder {
	fn follows(&self, previous: DayKey, next: DayKey) -> bool {
		match self {
			Self::NewestFirst => next < previous,
			Self::OldestFirst => next > previous,
		}
	}
}


/// Expected header layout of the state daily source.
///
/// The upstream provider keeps appending columns; a schema pins the layout
/// we last looked at so that drift shows up in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
	pub version: String,
	pub columns: Vec<String>,
}

static REQUIRED_COLUMNS: [&str; 6] = ["date", "state", "positive", "negative", "pending", "death"];

static LATEST_COLUMNS: [&str; 25] = [
	"date",
	"state",
	"positive",
	"negative",
	"pending",
	"hospitalizedCurrently",
	"hospitalizedCumulative",
	"inIcuCurrently",
	"inIcuCumulative",
	"onVentilatorCurrently",
	"onVentilatorCumulative",
	"recovered",
	"hash",
	"dateChecked",
	"death",
	"hospitalized",
	"total",
	"totalTestResults",
	"posNeg",
	"fips",
	"deathIncrease",
	"hospitalizedIncrease",
	"negativeIncrease",
	"positiveIncrease",
	"totalTestResultsIncrease",
];

impl ColumnSchema {
	pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(version: &str, columns: I) -> Self {
		Self{
			version: version.into(),
			columns: columns.into_iter().map(Into::into).collect(),
		}
	}

	/// Layout as of the 2020-04 upstream revision.
	pub fn latest() -> Self {
		Self::new("2020-04", LATEST_COLUMNS.iter().copied())
	}

	/// Only the columns the loader reads.
	pub fn minimal() -> Self {
		Self::new("minimal", REQUIRED_COLUMNS.iter().copied())
	}

	pub fn check(&self, headers: &csv::StringRecord) -> SchemaReport {
		let mut report = SchemaReport::default();
		for (position, expected) in self.columns.iter().enumerate() {
			let found = headers.get(position);
			if found != Some(expected.as_str()) {
				report.changed.push(ColumnChange{
					position,
					expected: expected.clone(),
					found: found.map(Into::into),
				});
			}
		}
		let known: HashSet<&str> = self.columns.iter().map(|c| c.as_str()).collect();
		let present: HashSet<&str> = headers.iter().collect();
		for h in headers.iter() {
			if !known.contains(h) {
				report.unexpected.push(h.into());
			}
		}
		for c in REQUIRED_COLUMNS.iter() {
			if !present.contains(c) {
				report.missing.push((*c).into());
			}
		}
		report
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
	pub position: usize,
	pub expected: String,
	pub found: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
	/// Positions where the header differs from the schema.
	pub changed: Vec<ColumnChange>,
	/// Header names the schema does not know.
	pub unexpected: Vec<String>,
	/// Columns the loader reads but the header lacks; they load as zero.
	pub missing: Vec<String>,
}

impl SchemaReport {
	pub fn is_clean(&self) -> bool {
		self.changed.is_empty() && self.unexpected.is_empty() && self.missing.is_empty()
	}

	fn log(&self, schema: &ColumnSchema) {
		for change in self.changed.iter() {
			warn!(
				"changed field at column {} (schema {}): expected {:?}, found {:?}",
				change.position, schema.version, change.expected, change.found,
			);
		}
		for name in self.unexpected.iter() {
			warn!("unexpected column {:?} (schema {})", name, schema.version);
		}
		for name in self.missing.iter() {
			error!("column {:?} is missing, its values load as zero", name);
		}
	}
}


#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// Records for later dates are ignored.
	pub cutoff: Option<DayKey>,
	pub order: SourceOrder,
	pub schema: ColumnSchema,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self{
			cutoff: None,
			order: SourceOrder::NewestFirst,
			schema: ColumnSchema::latest(),
		}
	}
}


#[derive(Debug, Clone, Deserialize)]
pub struct StateDailyRecord {
	pub date: DayKey,
	pub state: RegionId,
	#[serde(default)]
	pub positive: Option<u64>,
	#[serde(default)]
	pub negative: Option<u64>,
	#[serde(default)]
	pub pending: Option<u64>,
	#[serde(default)]
	pub death: Option<u64>,
}

impl StateDailyRecord {
	/// Per-row metrics; blank counts contribute zero.
	pub fn metrics(&self) -> EnumMap<Metric, u64> {
		let positive = self.positive.unwrap_or(0);
		let negative = self.negative.unwrap_or(0);
		let pending = self.pending.unwrap_or(0);
		let death = self.death.unwrap_or(0);
		enum_map! {
			Metric::Tests => positive + negative,
			Metric::TestsWithPending => positive + negative + pending,
			Metric::Cases => positive,
			Metric::Deaths => death,
		}
	}
}


/// Aligned per-state series and their national sums, oldest day first.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSeries {
	pub dates: Vec<DayKey>,
	pub series: EnumMap<Metric, Samples<RegionId>>,
	pub national: EnumMap<Metric, Vec<u64>>,
}

impl StateSeries {
	fn new(regions: &RegionTable) -> Self {
		Self{
			dates: Vec::new(),
			series: enum_map! { _ => Samples::new(regions.ids().cloned()) },
			national: enum_map! { _ => Vec::new() },
		}
	}

	pub fn latest_date(&self) -> Option<DayKey> {
		self.dates.last().copied()
	}

	/// Drop the most recent day of every series.
	pub fn pop_day(&mut self) -> Option<DayKey> {
		let date = self.dates.pop()?;
		for (_, series) in self.series.iter_mut() {
			series.pop_day();
		}
		for (_, national) in self.national.iter_mut() {
			national.pop();
		}
		Some(date)
	}

	fn reverse_days(&mut self) {
		self.dates.reverse();
		for (_, series) in self.series.iter_mut() {
			series.reverse_days();
		}
		for (_, national) in self.national.iter_mut() {
			national.reverse();
		}
	}
}


struct DayAccumulator {
	date: DayKey,
	values: EnumMap<Metric, Vec<Sample>>,
	reported: usize,
}

impl DayAccumulator {
	fn new(date: DayKey, nregions: usize) -> Self {
		Self{
			date,
			values: enum_map! { _ => vec![None; nregions] },
			reported: 0,
		}
	}

	fn submit(&mut self, index: usize, rec: &StateDailyRecord) -> Result<(), Error> {
		if self.values[Metric::Cases][index].is_some() {
			return Err(Error::DuplicateRecord{date: self.date, region: rec.state.clone()})
		}
		let metrics = rec.metrics();
		for (metric, v) in metrics.iter() {
			self.values[metric][index] = Some(*v);
		}
		self.reported += 1;
		Ok(())
	}
}


struct StateSeriesBuilder<'r> {
	regions: &'r RegionTable,
	order: SourceOrder,
	current: Option<DayAccumulator>,
	unknown: HashSet<RegionId>,
	out: StateSeries,
}

impl<'r> StateSeriesBuilder<'r> {
	fn new(regions: &'r RegionTable, order: SourceOrder) -> Self {
		Self{
			regions,
			order,
			current: None,
			unknown: HashSet::new(),
			out: StateSeries::new(regions),
		}
	}

	fn submit(&mut self, rec: &StateDailyRecord) -> Result<(), Error> {
		let index = match self.regions.index_of(&rec.state) {
			Some(i) => i,
			None => {
				if self.unknown.insert(rec.state.clone()) {
					warn!("unknown region {:?} on {}, dropping its rows", rec.state, rec.date);
				}
				return Ok(())
			},
		};

		let boundary = match self.current.as_ref() {
			Some(acc) if acc.date == rec.date => false,
			Some(acc) => {
				if !self.order.follows(acc.date, rec.date) {
					return Err(Error::OutOfOrder{previous: acc.date, found: rec.date})
				}
				true
			},
			None => true,
		};
		if boundary {
			let next = DayAccumulator::new(rec.date, self.regions.len());
			if let Some(done) = self.current.replace(next) {
				self.close_day(done);
			}
		}

		match self.current.as_mut() {
			Some(acc) => acc.submit(index, rec),
			None => Ok(()),
		}
	}

	fn close_day(&mut self, acc: DayAccumulator) {
		let i = self.out.dates.len();
		for (metric, values) in acc.values.iter() {
			let series = &mut self.out.series[metric];
			series.push_day(&values[..]);
			self.out.national[metric].push(series.sum_reported(i));
		}
		debug!(
			"closing {}: {} regions reported, {} missing",
			acc.date, acc.reported, self.out.series[Metric::Cases].count_missing(i),
		);
		self.out.dates.push(acc.date);
	}

	fn finish(mut self) -> Result<StateSeries, Error> {
		if let Some(done) = self.current.take() {
			self.close_day(done);
		}
		if self.out.dates.is_empty() {
			return Err(Error::NoData)
		}
		if self.order == SourceOrder::NewestFirst {
			self.out.reverse_days();
		}
		Ok(self.out)
	}
}


/// Load the per-state daily source into aligned, oldest-first series.
pub fn load_states<R: io::Read, S: ProgressSink + ?Sized>(
		s: &mut S,
		r: R,
		regions: &RegionTable,
		options: &LoadOptions,
) -> Result<StateSeries, Error> {
	let mut r = csv_reader(r);
	options.schema.check(r.headers()?).log(&options.schema);

	let mut builder = StateSeriesBuilder::new(regions, options.order);
	let mut n = 0;
	for (i, row) in r.deserialize().enumerate() {
		let rec: StateDailyRecord = row?;
		n = i + 1;
		match options.cutoff {
			Some(cutoff) if rec.date > cutoff => continue,
			_ => (),
		};
		builder.submit(&rec)?;
		if i % 1000 == 999 {
			s.update(i + 1);
		}
	}
	s.finish(n);
	builder.finish()
}
