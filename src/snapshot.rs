use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use enum_map::{enum_map, EnumMap};

use super::date::DayKey;
use super::derived::{doubling_rate, doubling_rate_samples};
use super::error::Error;
use super::ioutil::magic_open;
use super::metric::{Metric, Variant};
use super::national::{load_reference, NationalReference, ReferenceOptions};
use super::progress::default_output;
use super::ranking::{rank, rank_history, ranking_rows, RankHistory, RankRow, Ranking, RankingPair, RankingRequest};
use super::regions::{RegionId, RegionTable};
use super::states::{load_states, LoadOptions, StateSeries};
use super::timeseries::Samples;


fn rank_all(states: &StateSeries, regions: &RegionTable) -> EnumMap<Metric, RankingPair> {
	enum_map! {
		metric => rank(metric, &states.series[metric], regions),
	}
}

fn check_dates(current: DayKey, reference: Option<&NationalReference>) -> Result<(), Error> {
	let reference = match reference {
		Some(r) => r,
		None => return Ok(()),
	};
	match reference.latest_date() {
		Some(d) if d == current => Ok(()),
		other => Err(Error::DateMismatch{regions: current, reference: other}),
	}
}


/// One loaded snapshot: the aligned state series, the optional national
/// reference and the rankings derived from their latest day.
///
/// Rankings are only ever computed inside the calls which change the
/// series, so a reader always sees rankings of the current date.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	regions: Arc<RegionTable>,
	states: StateSeries,
	reference: Option<NationalReference>,
	current: DayKey,
	rankings: EnumMap<Metric, RankingPair>,
}

impl Snapshot {
	pub fn build(
			regions: Arc<RegionTable>,
			states: StateSeries,
			reference: Option<NationalReference>,
	) -> Result<Self, Error> {
		let current = states.latest_date().ok_or(Error::NoData)?;
		check_dates(current, reference.as_ref())?;
		let rankings = rank_all(&states, &regions);
		Ok(Self{
			regions,
			states,
			reference,
			current,
			rankings,
		})
	}

	/// Load both sources from files; `.gz` files are decompressed on the fly.
	pub fn load<P: AsRef<Path>>(
			regions: Arc<RegionTable>,
			states_path: P,
			options: &LoadOptions,
			reference_path: Option<&Path>,
			reference_options: &ReferenceOptions,
	) -> Result<Self, Error> {
		let mut progress = default_output("states");
		let states = load_states(&mut *progress, magic_open(states_path)?, &regions, options)?;
		let reference = match reference_path {
			Some(path) => {
				let mut progress = default_output("reference");
				Some(load_reference(&mut *progress, magic_open(path)?, reference_options)?)
			},
			None => None,
		};
		let result = Self::build(regions, states, reference)?;
		info!("snapshot of {} loaded, {} days", result.current, result.states.dates.len());
		Ok(result)
	}

	/// Drop the most recent day of every series and re-rank.
	///
	/// Fails without touching anything if fewer than two dates remain, or if
	/// the national reference would no longer end on the new current date.
	///
	/// Reference days after the new current date are dropped with it. When
	/// the state source skipped days, the result equals a load with the new
	/// current date as cutoff; a cutoff inside the gap fails the date check
	/// instead.
	pub fn remove_last_day(&mut self) -> Result<DayKey, Error> {
		let n = self.states.dates.len();
		if n < 2 {
			return Err(Error::TruncationFloor{remaining: n})
		}
		let next = self.states.dates[n - 2];
		if let Some(reference) = self.reference.as_ref() {
			let stale = reference.dates.iter().rev().take_while(|d| **d > next).count();
			let latest = reference.dates.iter().rev().nth(stale).copied();
			if latest != Some(next) {
				return Err(Error::DateMismatch{regions: next, reference: latest})
			}
		}

		let removed = self.states.pop_day();
		if let Some(reference) = self.reference.as_mut() {
			while reference.latest_date().map(|d| d > next).unwrap_or(false) {
				reference.pop_day();
			}
		}
		self.current = next;
		self.rankings = rank_all(&self.states, &self.regions);
		debug!("removed {:?}, snapshot now at {}", removed, self.current);
		Ok(self.current)
	}

	pub fn current_date(&self) -> DayKey {
		self.current
	}

	pub fn dates(&self) -> &[DayKey] {
		&self.states.dates[..]
	}

	pub fn regions(&self) -> &RegionTable {
		&self.regions
	}

	pub fn series(&self, metric: Metric) -> &Samples<RegionId> {
		&self.states.series[metric]
	}

	/// Sum of all reported region values per day.
	pub fn national(&self, metric: Metric) -> &[u64] {
		&self.states.national[metric][..]
	}

	pub fn ranking(&self, metric: Metric, variant: Variant) -> &Ranking {
		self.rankings[metric].get(variant)
	}

	pub fn reference(&self) -> Option<&NationalReference> {
		self.reference.as_ref()
	}

	pub fn ranking_table(&self, request: &RankingRequest) -> Vec<RankRow> {
		ranking_rows(
			self.ranking(request.metric, request.variant),
			self.series(request.metric),
			&self.regions,
			request.threshold,
		)
	}

	pub fn rank_history(&self, metric: Metric, variant: Variant, days: usize) -> Vec<RankHistory> {
		rank_history(self.series(metric), &self.regions, variant, days)
	}

	pub fn doubling_rate(&self, region: &str, metric: Metric) -> Option<f64> {
		doubling_rate_samples(self.series(metric).get(region)?)
	}

	pub fn national_doubling_rate(&self, metric: Metric) -> Option<f64> {
		doubling_rate(self.national(metric))
	}

	pub fn reference_doubling_rate(&self, metric: Metric) -> Option<f64> {
		doubling_rate(self.reference.as_ref()?.get(metric))
	}
}
