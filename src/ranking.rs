use std::cmp::Ordering;

use log::{debug, warn};

use super::derived::{latest_with_delta, normalize, trajectory, TrajectoryRequest};
use super::metric::{Metric, Variant};
use super::regions::{RegionId, RegionTable};
use super::timeseries::Samples;


#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
	pub region: RegionId,
	pub value: f64,
}


/// Regions of one metric ordered by descending value on the latest day.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
	pub metric: Metric,
	pub variant: Variant,
	pub entries: Vec<RankEntry>,
	/// Regions without a value on the latest day. Their rank is unknown.
	pub unranked: Vec<RegionId>,
}

impl Ranking {
	pub fn regions(&self) -> impl Iterator<Item = &RegionId> + '_ {
		self.entries.iter().map(|e| &e.region)
	}

	/// 1-based rank, `None` if the region is not ranked.
	pub fn rank_of(&self, region: &str) -> Option<usize> {
		self.entries.iter().position(|e| e.region.as_str() == region).map(|i| i + 1)
	}

	pub fn value_of(&self, region: &str) -> Option<f64> {
		self.entries.iter().find(|e| e.region.as_str() == region).map(|e| e.value)
	}

	pub fn type_name(&self) -> String {
		self.variant.type_name(self.metric)
	}
}


#[derive(Debug, Clone, PartialEq)]
pub struct RankingPair {
	pub raw: Ranking,
	pub normalized: Ranking,
}

impl RankingPair {
	pub fn get(&self, variant: Variant) -> &Ranking {
		match variant {
			Variant::Raw => &self.raw,
			Variant::Normalized => &self.normalized,
		}
	}
}


/// Values of all regions on day `index`, split into reported (table index,
/// value) pairs and missing table indices.
fn day_values(series: &Samples<RegionId>, regions: &RegionTable, index: usize) -> (Vec<(usize, u64)>, Vec<usize>) {
	let mut reported = Vec::with_capacity(regions.len());
	let mut missing = Vec::new();
	for (i, region) in regions.iter().enumerate() {
		match series.get_value(region.id.as_str(), index) {
			Some(Some(v)) => reported.push((i, v)),
			_ => missing.push(i),
		}
	}
	(reported, missing)
}

/// Stable descending order; equal values keep table order.
fn sorted_desc(mut values: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
	values.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
	values
}

fn variant_values(reported: &[(usize, u64)], regions: &RegionTable, variant: Variant) -> Vec<(usize, f64)> {
	reported.iter().filter_map(|(i, v)| {
		let region = regions.at(*i)?;
		Some((*i, match variant {
			Variant::Raw => *v as f64,
			Variant::Normalized => normalize(*v, region.population),
		}))
	}).collect()
}

fn build(metric: Metric, variant: Variant, regions: &RegionTable, sorted: Vec<(usize, f64)>, missing: &[usize]) -> Ranking {
	let entries = sorted.into_iter().filter_map(|(i, value)| {
		Some(RankEntry{region: regions.at(i)?.id.clone(), value})
	}).collect();
	let unranked = missing.iter().filter_map(|i| Some(regions.at(*i)?.id.clone())).collect();
	Ranking{
		metric,
		variant,
		entries,
		unranked,
	}
}


/// Rank all regions by the latest value of `series`, raw and per capita.
pub fn rank(metric: Metric, series: &Samples<RegionId>, regions: &RegionTable) -> RankingPair {
	let (reported, missing) = match series.len() {
		0 => (Vec::new(), (0..regions.len()).collect()),
		n => day_values(series, regions, n - 1),
	};
	for i in missing.iter() {
		if let Some(region) = regions.at(*i) {
			warn!("ranking {}: no latest value for {}, rank unknown", metric, region.id);
		}
	}
	let raw = sorted_desc(variant_values(&reported, regions, Variant::Raw));
	let normalized = sorted_desc(variant_values(&reported, regions, Variant::Normalized));
	RankingPair{
		raw: build(metric, Variant::Raw, regions, raw, &missing),
		normalized: build(metric, Variant::Normalized, regions, normalized, &missing),
	}
}


/// Parameters of a ranking table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingRequest {
	pub metric: Metric,
	pub variant: Variant,
	/// Level from which a region's trajectory is reported.
	pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
	/// `None` for regions without a latest value.
	pub rank: Option<usize>,
	pub region: RegionId,
	pub value: f64,
	/// Change since the previous reported value.
	pub delta: f64,
	/// Values at or above the request threshold, oldest first.
	pub trajectory: Vec<f64>,
}

/// One row per region in ranking order, unranked regions last.
pub fn ranking_rows(ranking: &Ranking, series: &Samples<RegionId>, regions: &RegionTable, threshold: f64) -> Vec<RankRow> {
	let unfiltered = TrajectoryRequest{variant: ranking.variant, threshold: None};
	let filtered = TrajectoryRequest{variant: ranking.variant, threshold: Some(threshold)};
	let ranked = ranking.regions().enumerate().map(|(i, region)| (Some(i + 1), region));
	let unranked = ranking.unranked.iter().map(|region| (None, region));
	ranked.chain(unranked).filter_map(|(rank, region)| {
		let samples = series.get(region.as_str())?;
		let population = regions.population(region)?;
		let (value, delta) = latest_with_delta(&trajectory(samples, population, &unfiltered));
		Some(RankRow{
			rank,
			region: region.clone(),
			value,
			delta,
			trajectory: trajectory(samples, population, &filtered),
		})
	}).collect()
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankHistory {
	pub region: RegionId,
	/// Rank per day, oldest first; `None` where the region did not report.
	pub ranks: Vec<Option<usize>>,
}

/// Ranks of every region on each of the last `days` days, in table order.
pub fn rank_history(series: &Samples<RegionId>, regions: &RegionTable, variant: Variant, days: usize) -> Vec<RankHistory> {
	let days = days.min(series.len());
	let first = series.len() - days;
	let mut result: Vec<RankHistory> = regions.iter().map(|r| RankHistory{
		region: r.id.clone(),
		ranks: Vec::with_capacity(days),
	}).collect();
	for index in first..series.len() {
		let (reported, missing) = day_values(series, regions, index);
		debug!("rank history day {}: {} ranked, {} unknown", index, reported.len(), missing.len());
		let sorted = sorted_desc(variant_values(&reported, regions, variant));
		let mut ranks = vec![None; regions.len()];
		for (position, (i, _)) in sorted.iter().enumerate() {
			ranks[*i] = Some(position + 1);
		}
		for (entry, r) in result.iter_mut().zip(ranks.into_iter()) {
			entry.ranks.push(r);
		}
	}
	result
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use proptest::prelude::*;

	fn table(pops: &[(&str, u64)]) -> RegionTable {
		let mut t = RegionTable::new();
		for (id, p) in pops.iter() {
			t.insert(id, id, *p, None).unwrap();
		}
		t
	}

	fn series(t: &RegionTable, days: &[&[Option<u64>]]) -> Samples<RegionId> {
		let mut s = Samples::new(t.ids().cloned());
		for day in days.iter() {
			s.push_day(day);
		}
		s
	}

	fn order(r: &Ranking) -> Vec<&str> {
		r.regions().map(|r| r.as_str()).collect()
	}

	#[test]
	fn test_rank_raw_and_normalized() {
		let t = table(&[("A", 1000), ("B", 100), ("C", 10000)]);
		let s = series(&t, &[&[Some(10), Some(20), Some(30)]]);
		let pair = rank(Metric::Cases, &s, &t);
		assert_eq!(order(&pair.raw), vec!["C", "B", "A"]);
		assert_eq!(order(&pair.normalized), vec!["B", "A", "C"]);
		assert_eq!(pair.normalized.value_of("B"), Some(200000.));
		assert_eq!(pair.raw.rank_of("A"), Some(3));
	}

	#[test]
	fn test_ties_keep_table_order() {
		let t = table(&[("Z", 100), ("Y", 100), ("X", 100), ("W", 100)]);
		let s = series(&t, &[&[Some(5), Some(7), Some(5), Some(7)]]);
		let pair = rank(Metric::Deaths, &s, &t);
		assert_eq!(order(&pair.raw), vec!["Y", "W", "Z", "X"]);
		assert_eq!(order(&pair.normalized), vec!["Y", "W", "Z", "X"]);
		assert_eq!(pair, rank(Metric::Deaths, &s, &t));
	}

	#[test]
	fn test_missing_latest_is_unranked() {
		let t = table(&[("A", 100), ("B", 100), ("C", 100)]);
		let s = series(&t, &[&[Some(1), Some(1), Some(1)], &[Some(3), None, Some(0)]]);
		let pair = rank(Metric::Cases, &s, &t);
		assert_eq!(order(&pair.raw), vec!["A", "C"]);
		assert_eq!(pair.raw.unranked, vec![RegionId::from("B")]);
		assert_eq!(pair.raw.rank_of("B"), None);
		assert_eq!(pair.normalized.unranked, vec![RegionId::from("B")]);
	}

	#[test]
	fn test_ranking_is_permutation_of_regions() {
		let t = table(&[("A", 3), ("B", 5), ("C", 7), ("D", 11), ("E", 13)]);
		let s = series(&t, &[&[Some(9), None, Some(2), Some(40), Some(9)]]);
		let pair = rank(Metric::Tests, &s, &t);
		for r in [&pair.raw, &pair.normalized].iter() {
			let mut all: Vec<&str> = order(r);
			all.extend(r.unranked.iter().map(|r| r.as_str()));
			assert_eq!(all.len(), t.len());
			let unique: HashSet<&str> = all.iter().copied().collect();
			assert_eq!(unique.len(), t.len());
		}
	}

	proptest! {
		#[test]
		fn test_normalized_order_invariant_under_population_scaling(
			rows in prop::collection::vec((1u64..10_000_000, prop::option::weighted(0.9, 0u64..1_000_000)), 1..12),
			shift in 0u32..20,
		) {
			let ids: Vec<String> = (0..rows.len()).map(|i| format!("R{}", i)).collect();
			let pops: Vec<(&str, u64)> = ids.iter().zip(rows.iter()).map(|(id, (p, _))| (id.as_str(), *p)).collect();
			// powers of two keep the quotients exact
			let scaled: Vec<(&str, u64)> = pops.iter().map(|(id, p)| (*id, p << shift)).collect();
			let day: Vec<Option<u64>> = rows.iter().map(|(_, v)| *v).collect();
			let t1 = table(&pops);
			let t2 = table(&scaled);
			let r1 = rank(Metric::Cases, &series(&t1, &[&day[..]]), &t1);
			let r2 = rank(Metric::Cases, &series(&t2, &[&day[..]]), &t2);
			prop_assert_eq!(order(&r1.normalized), order(&r2.normalized));
			prop_assert_eq!(&r1.normalized.unranked, &r2.normalized.unranked);
			prop_assert_eq!(order(&r1.raw), order(&r2.raw));
		}
	}

	#[test]
	fn test_rescaling_one_raw_value_moves_it() {
		let t = table(&[("A", 1000), ("B", 300), ("C", 7000), ("D", 50)]);
		let day: &[Option<u64>] = &[Some(100), Some(40), Some(600), Some(1)];
		let r1 = rank(Metric::Cases, &series(&t, &[day]), &t);
		let bumped: &[Option<u64>] = &[Some(100), Some(40), Some(600), Some(100)];
		let r2 = rank(Metric::Cases, &series(&t, &[bumped]), &t);
		assert_ne!(order(&r1.normalized), order(&r2.normalized));
	}

	#[test]
	fn test_empty_series_ranks_nobody() {
		let t = table(&[("A", 1), ("B", 1)]);
		let s = series(&t, &[]);
		let pair = rank(Metric::Cases, &s, &t);
		assert!(pair.raw.entries.is_empty());
		assert_eq!(pair.raw.unranked.len(), 2);
	}

	#[test]
	fn test_ranking_rows() {
		let t = table(&[("A", 1_000_000), ("B", 1_000_000)]);
		let s = series(&t, &[&[Some(5), Some(1)], &[Some(10), None], &[Some(25), None]]);
		let pair = rank(Metric::Cases, &s, &t);
		let rows = ranking_rows(&pair.raw, &s, &t, 10.);
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].rank, Some(1));
		assert_eq!(rows[0].region.as_str(), "A");
		assert_eq!(rows[0].value, 25.);
		assert_eq!(rows[0].delta, 15.);
		assert_eq!(rows[0].trajectory, vec![10., 25.]);
		assert_eq!(rows[1].rank, None);
		assert_eq!(rows[1].value, 1.);
		assert!(rows[1].trajectory.is_empty());
	}

	#[test]
	fn test_rank_history() {
		let t = table(&[("A", 100), ("B", 100)]);
		let s = series(&t, &[
			&[Some(1), Some(9)],
			&[Some(5), None],
			&[Some(5), Some(6)],
		]);
		let h = rank_history(&s, &t, Variant::Normalized, 5);
		assert_eq!(h[0].region.as_str(), "A");
		assert_eq!(h[0].ranks, vec![Some(2), Some(1), Some(2)]);
		assert_eq!(h[1].ranks, vec![Some(1), None, Some(1)]);
		let h = rank_history(&s, &t, Variant::Raw, 1);
		assert_eq!(h[1].ranks, vec![Some(1)]);
	}
}
