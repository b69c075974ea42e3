use log::{debug, info, warn};

use super::geo::{CountyDay, CountyMetric, CountyTable, Fips, GeoConfig};


/// What happened to one state's unknown count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// Spread over the counties which reported a non-zero value.
	Reporting(usize),
	/// No county reported; spread over all of them after zeroing.
	WholeState(usize),
	/// Excluded territory or a state without counties.
	Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
	pub state: Fips,
	pub metric: CountyMetric,
	pub amount: u64,
	pub outcome: Outcome,
}


fn spread(day: &mut CountyDay, table: &CountyTable, metric: CountyMetric, targets: &[Fips], amount: f64) {
	let area: f64 = targets.iter().filter_map(|f| table.area(f)).sum();
	if !(area > 0.) {
		return
	}
	let values = &mut day.values[metric];
	for fips in targets.iter() {
		if let Some(a) = table.area(fips) {
			*values.entry(fips.clone()).or_insert(0.) += amount * a / area;
		}
	}
}


/// Move the values of combined identifiers onto their constituents by area
/// share, adding to what the constituents already hold.
pub fn split_combined(day: &mut CountyDay, table: &CountyTable, config: &GeoConfig) {
	for combined in config.combined.iter() {
		if table.area(&combined.fips).is_none() {
			warn!("{} has no area, not splitting", combined.name);
			continue
		}
		for metric in CountyMetric::ALL.iter() {
			let value = match day.values[*metric].remove(&combined.fips) {
				Some(v) => v,
				None => continue,
			};
			debug!("splitting {} {} of {} over {} parts", value, metric.slug(), combined.name, combined.parts.len());
			spread(day, table, *metric, &combined.parts[..], value);
		}
	}
	day.refresh_max(table, config.area_scale);
}


/// Spread every state's unknown count over its counties by area share.
///
/// Counties with a non-zero value are the targets. If there are none, the
/// whole state is zeroed and becomes the target. Each state only touches its
/// own counties, so the order of states does not matter.
pub fn distribute_unknown(day: &mut CountyDay, table: &CountyTable, config: &GeoConfig) -> Vec<Distribution> {
	let mut result = Vec::new();
	for metric in CountyMetric::ALL.iter() {
		let metric = *metric;
		let unknown = std::mem::take(&mut day.unknown[metric]);
		for (state, amount) in unknown.iter() {
			let name = table.name(state).unwrap_or("?");
			let counties = table.counties_of(state);
			let outcome = if config.is_excluded(state) || counties.is_empty() {
				warn!("dropping {} unknown {} of {} ({})", amount, metric.slug(), name, state);
				Outcome::Dropped
			} else {
				let reporting: Vec<Fips> = counties.iter()
					.filter(|f| day.values[metric].get(*f).map(|v| *v > 0.).unwrap_or(false))
					.cloned()
					.collect();
				if reporting.is_empty() {
					info!("distributing unknown {} of {} to the entire state", metric.slug(), name);
					for fips in counties.iter() {
						day.values[metric].insert(fips.clone(), 0.);
					}
					spread(day, table, metric, counties, *amount as f64);
					Outcome::WholeState(counties.len())
				} else {
					spread(day, table, metric, &reporting[..], *amount as f64);
					Outcome::Reporting(reporting.len())
				}
			};
			result.push(Distribution{
				state: state.clone(),
				metric,
				amount: *amount,
				outcome,
			});
		}
	}
	day.refresh_max(table, config.area_scale);
	result
}


/// Both passes in order; the maxima reflect the final values.
pub fn redistribute(day: &mut CountyDay, table: &CountyTable, config: &GeoConfig) -> Vec<Distribution> {
	split_combined(day, table, config);
	distribute_unknown(day, table, config)
}
