use std::collections::{BTreeMap, HashMap};
use std::io;

use log::{debug, warn};

use serde::Deserialize;

use smartstring::alias::{String as SmartString};

use enum_map::{enum_map, Enum, EnumMap};

use super::date::DayKey;
use super::error::Error;
use super::ioutil::csv_reader;
use super::progress::ProgressSink;


/// Five digit county code; states use `SS999`.
pub type Fips = SmartString;

/// Code of the state a county belongs to.
pub fn state_of(fips: &str) -> Option<Fips> {
	if fips.len() < 2 || !fips.is_ascii() {
		return None
	}
	let mut result = Fips::from(&fips[..2]);
	result.push_str("999");
	Some(result)
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum CountyMetric {
	Cases,
	Deaths,
}

impl CountyMetric {
	pub const ALL: [CountyMetric; 2] = [CountyMetric::Cases, CountyMetric::Deaths];

	pub fn slug(&self) -> &'static str {
		match self {
			Self::Cases => "cases",
			Self::Deaths => "deaths",
		}
	}
}


/// A source identifier which stands for several counties at once.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRegion {
	pub fips: Fips,
	pub name: String,
	/// County name used by the source for rows without a code.
	pub county: String,
	/// Restricts the county name match to one state.
	pub state: Option<String>,
	pub parts: Vec<Fips>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraState {
	pub fips: Fips,
	pub name: String,
	pub area: f64,
}


#[derive(Debug, Clone, PartialEq)]
pub struct GeoConfig {
	pub combined: Vec<CombinedRegion>,
	/// (old, new) county codes.
	pub renumbered: Vec<(Fips, Fips)>,
	/// States whose unknown counts are never distributed.
	pub excluded_states: Vec<Fips>,
	/// Territories the census table lacks.
	pub extra_states: Vec<ExtraState>,
	/// Multiplier for values per square mile.
	pub area_scale: f64,
}

fn fips_list(codes: &[&str]) -> Vec<Fips> {
	codes.iter().map(|c| Fips::from(*c)).collect()
}

impl Default for GeoConfig {
	fn default() -> Self {
		Self{
			combined: vec![
				CombinedRegion{
					fips: "36998".into(),
					name: "New York City".into(),
					county: "New York City".into(),
					state: None,
					// New York, Kings, Queens, Bronx, Richmond
					parts: fips_list(&["36061", "36047", "36081", "36005", "36085"]),
				},
				CombinedRegion{
					fips: "29998".into(),
					name: "Kansas City".into(),
					county: "Kansas City".into(),
					state: Some("Missouri".into()),
					// Cass, Clay, Jackson, Platte
					parts: fips_list(&["29037", "29047", "29095", "29165"]),
				},
			],
			// Shannon County SD became Oglala Lakota County in 2015
			renumbered: vec![("46113".into(), "46102".into())],
			excluded_states: fips_list(&["72999", "78999", "66999", "69999"]),
			extra_states: vec![
				ExtraState{fips: "60999".into(), name: "American Samoa".into(), area: 76.83},
				ExtraState{fips: "66999".into(), name: "Guam".into(), area: 212.},
				ExtraState{fips: "69999".into(), name: "Northern Mariana Islands".into(), area: 184.2},
				ExtraState{fips: "78999".into(), name: "Virgin Islands".into(), area: 133.7},
			],
			area_scale: 1_000_000.,
		}
	}
}

impl GeoConfig {
	pub fn renumber<'x>(&'x self, fips: &'x str) -> &'x str {
		for (old, new) in self.renumbered.iter() {
			if old.as_str() == fips {
				return new.as_str()
			}
		}
		fips
	}

	pub fn is_excluded(&self, state: &str) -> bool {
		self.excluded_states.iter().any(|s| s.as_str() == state)
	}

	fn combined_for(&self, county: &str, state: &str) -> Option<&CombinedRegion> {
		self.combined.iter().find(|c| {
			c.county == county && c.state.as_ref().map(|s| s == state).unwrap_or(true)
		})
	}

	fn is_part_of_combined(&self, fips: &str) -> bool {
		self.combined.iter().any(|c| c.parts.iter().any(|p| p.as_str() == fips))
	}
}


/// County and state names and land areas.
#[derive(Debug, Clone, Default)]
pub struct CountyTable {
	names: HashMap<Fips, String>,
	area: HashMap<Fips, f64>,
	state_fips: HashMap<String, Fips>,
	counties: BTreeMap<Fips, Vec<Fips>>,
	us_area: f64,
}

fn checked_area(fips: &str, area: f64) -> Result<f64, Error> {
	if area > 0. && area.is_finite() {
		Ok(area)
	} else {
		Err(Error::InvalidField{field: "area", value: format!("{} for {}", area, fips)})
	}
}

impl CountyTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_state(&mut self, fips: &str, name: &str, area: f64) -> Result<(), Error> {
		let area = checked_area(fips, area)?;
		self.names.insert(fips.into(), name.into());
		self.area.insert(fips.into(), area);
		self.state_fips.insert(name.into(), fips.into());
		self.counties.entry(fips.into()).or_insert_with(Vec::new);
		Ok(())
	}

	pub fn add_county(&mut self, fips: &str, name: &str, area: f64) -> Result<(), Error> {
		let area = checked_area(fips, area)?;
		let state = match state_of(fips) {
			Some(s) => s,
			None => return Err(Error::InvalidField{field: "fips", value: fips.into()}),
		};
		self.counties.entry(state).or_insert_with(Vec::new).push(fips.into());
		self.names.insert(fips.into(), name.into());
		self.area.insert(fips.into(), area);
		self.us_area += area;
		Ok(())
	}

	/// Register a combined identifier with the summed area of its parts.
	pub fn add_combined(&mut self, combined: &CombinedRegion) {
		let mut area = 0.;
		for part in combined.parts.iter() {
			match self.area.get(part) {
				Some(a) => area += a,
				None => warn!("{}: constituent {} has no area", combined.name, part),
			}
		}
		self.names.insert(combined.fips.clone(), combined.name.clone());
		if area > 0. {
			self.area.insert(combined.fips.clone(), area);
		}
	}

	/// Read the census GCT-PH1 county table.
	pub fn from_census<R: io::Read>(r: R, config: &GeoConfig) -> Result<Self, Error> {
		let mut table = Self::new();
		let mut r = csv_reader(r);
		for row in r.records() {
			let row = row?;
			let field = |i: usize| row.get(i).unwrap_or("");
			if field(0) == "GEO.id" || field(0) == "Id" {
				continue
			}
			let fips = field(4);
			let label = field(6);
			if fips.is_empty() {
				if label != "United States" {
					warn!("census row without code for {:?}", label);
				}
				continue
			}
			let area: f64 = match field(11).parse() {
				Ok(v) => v,
				Err(_) => return Err(Error::InvalidField{field: "area", value: field(11).into()}),
			};
			if fips.len() == 2 {
				let mut state = Fips::from(fips);
				state.push_str("999");
				table.add_state(&state, label, area)?;
				continue
			}
			let new = config.renumber(fips);
			if new != fips {
				debug!("renumbering {} to {} for {:?} ({})", fips, new, label, field(5));
			}
			table.add_county(new, label, area)?;
		}
		if table.counties.is_empty() {
			return Err(Error::NoData)
		}
		for combined in config.combined.iter() {
			table.add_combined(combined);
		}
		for extra in config.extra_states.iter() {
			table.add_state(&extra.fips, &extra.name, extra.area)?;
		}
		Ok(table)
	}

	pub fn contains(&self, fips: &str) -> bool {
		self.names.contains_key(fips)
	}

	pub fn name(&self, fips: &str) -> Option<&str> {
		self.names.get(fips).map(|s| s.as_str())
	}

	pub fn area(&self, fips: &str) -> Option<f64> {
		self.area.get(fips).copied()
	}

	pub fn state_fips(&self, name: &str) -> Option<&Fips> {
		self.state_fips.get(name)
	}

	/// Counties of a state, in census order. Combined identifiers are not
	/// counties.
	pub fn counties_of(&self, state: &str) -> &[Fips] {
		self.counties.get(state).map(|v| &v[..]).unwrap_or(&[])
	}

	pub fn us_area(&self) -> f64 {
		self.us_area
	}
}


#[derive(Debug, Clone, Deserialize)]
pub struct CountyRecord {
	pub date: DayKey,
	pub county: String,
	pub state: String,
	#[serde(default)]
	pub fips: Option<Fips>,
	pub cases: u64,
	#[serde(default)]
	pub deaths: Option<u64>,
}

impl CountyRecord {
	fn values(&self) -> EnumMap<CountyMetric, u64> {
		enum_map! {
			CountyMetric::Cases => self.cases,
			CountyMetric::Deaths => self.deaths.unwrap_or(0),
		}
	}
}


/// County values of a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyDay {
	pub date: DayKey,
	pub values: EnumMap<CountyMetric, BTreeMap<Fips, f64>>,
	/// Counts a state reported without a county, keyed by state code.
	pub unknown: EnumMap<CountyMetric, BTreeMap<Fips, u64>>,
	/// Sum of all county attributed rows.
	pub us_totals: EnumMap<CountyMetric, u64>,
	/// Largest value per scaled square mile.
	pub max_per_area: EnumMap<CountyMetric, f64>,
}

impl CountyDay {
	fn new(date: DayKey, table: &CountyTable, config: &GeoConfig) -> Self {
		let mut values: EnumMap<CountyMetric, BTreeMap<Fips, f64>> = enum_map! { _ => BTreeMap::new() };
		for combined in config.combined.iter() {
			for part in combined.parts.iter().filter(|p| table.contains(p)) {
				for (_, v) in values.iter_mut() {
					v.insert(part.clone(), 0.);
				}
			}
		}
		Self{
			date,
			values,
			unknown: enum_map! { _ => BTreeMap::new() },
			us_totals: enum_map! { _ => 0 },
			max_per_area: enum_map! { _ => 0. },
		}
	}

	pub fn value(&self, metric: CountyMetric, fips: &str) -> f64 {
		self.values[metric].get(fips).copied().unwrap_or(0.)
	}

	pub fn per_area(&self, table: &CountyTable, metric: CountyMetric, fips: &str, scale: f64) -> Option<f64> {
		Some(self.value(metric, fips) * scale / table.area(fips)?)
	}

	pub fn total(&self, metric: CountyMetric) -> f64 {
		self.values[metric].values().sum()
	}

	/// Recompute the maxima from the current values.
	pub fn refresh_max(&mut self, table: &CountyTable, scale: f64) {
		for metric in CountyMetric::ALL.iter() {
			let mut max = 0.;
			for fips in self.values[*metric].keys() {
				match self.per_area(table, *metric, fips, scale) {
					Some(v) if v > max => max = v,
					_ => (),
				}
			}
			self.max_per_area[*metric] = max;
		}
	}

	fn submit(&mut self, rec: &CountyRecord, table: &CountyTable, config: &GeoConfig) {
		let values = rec.values();
		let fips = match rec.fips.as_ref() {
			Some(f) => Some(Fips::from(config.renumber(f))),
			None => config.combined_for(&rec.county, &rec.state).map(|c| c.fips.clone()),
		};
		let fips = match fips {
			Some(f) => f,
			None => {
				match table.state_fips(&rec.state) {
					Some(state) => {
						for (metric, v) in values.iter() {
							if *v != 0 {
								*self.unknown[metric].entry(state.clone()).or_insert(0) += *v;
							}
						}
					},
					None => warn!("row without county code for unknown state {:?} on {}", rec.state, rec.date),
				};
				return
			},
		};
		if config.is_part_of_combined(&fips) {
			warn!("{} reported separately although it is part of a combined region", fips);
		}
		let area = match table.area(&fips) {
			Some(a) => a,
			None => {
				warn!("unknown county {} ({:?}, {:?}), dropping", fips, rec.county, rec.state);
				return
			},
		};
		for (metric, v) in values.iter() {
			self.values[metric].insert(fips.clone(), *v as f64);
			self.us_totals[metric] += *v;
			let per_area = *v as f64 * config.area_scale / area;
			if per_area > self.max_per_area[metric] {
				self.max_per_area[metric] = per_area;
			}
		}
	}
}


/// Load one day of the county source, oldest date first.
///
/// Without `date` the most recent day is kept.
pub fn load_county_day<R: io::Read, S: ProgressSink + ?Sized>(
		s: &mut S,
		r: R,
		table: &CountyTable,
		config: &GeoConfig,
		date: Option<DayKey>,
) -> Result<CountyDay, Error> {
	let mut r = csv_reader(r);
	let mut current: Option<CountyDay> = None;
	let mut found = false;
	let mut n = 0;
	for (i, row) in r.deserialize().enumerate() {
		let rec: CountyRecord = row?;
		n = i + 1;
		if i % 10000 == 9999 {
			s.update(n);
		}
		let previous = current.as_ref().map(|day| day.date);
		if previous != Some(rec.date) {
			if let Some(previous) = previous {
				if rec.date < previous {
					return Err(Error::OutOfOrder{previous, found: rec.date})
				}
				if found {
					break
				}
			}
			match date {
				Some(d) if d != rec.date => {
					// keep the skipped date around for the ordering check
					current = Some(CountyDay::new(rec.date, table, config));
					continue
				},
				Some(_) => found = true,
				None => (),
			};
			current = Some(CountyDay::new(rec.date, table, config));
		}
		match date {
			Some(d) if d != rec.date => continue,
			_ => (),
		};
		if let Some(day) = current.as_mut() {
			day.submit(&rec, table, config);
		}
	}
	s.finish(n);

	match (date, current) {
		(Some(d), _) if !found => Err(Error::DateNotFound(d)),
		(_, None) => Err(Error::NoData),
		(_, Some(day)) => {
			debug!(
				"{}: {} counties with cases, US totals {:?}",
				day.date, day.values[CountyMetric::Cases].len(), day.us_totals,
			);
			Ok(day)
		},
	}
}


#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::progress::Quiet;

	pub(crate) static CENSUS: &str = concat!(
		"GEO.id,GEO.id2,GEO.display-label,GCT_STUB.target-geo-id,GCT_STUB.target-geo-id2,GCT_STUB.display-label,GCT_STUB.display-label,HD01,HD02,SUBHD0301,SUBHD0302,SUBHD0303,SUBHD0401,SUBHD0402\n",
		"0100000US,,United States,0100000US,,United States,United States,1,1,1,1,3000,1,1\n",
		"0100000US,,United States,0400000US36,36,United States - New York,New York,1,1,1,1,1000,1,1\n",
		"0100000US,,United States,0500000US36005,36005,United States - New York - Bronx County,Bronx County,1,1,1,1,40,1,1\n",
		"0100000US,,United States,0500000US36047,36047,United States - New York - Kings County,Kings County,1,1,1,1,70,1,1\n",
		"0100000US,,United States,0500000US36061,36061,United States - New York - New York County,New York County,1,1,1,1,20,1,1\n",
		"0100000US,,United States,0500000US36081,36081,United States - New York - Queens County,Queens County,1,1,1,1,110,1,1\n",
		"0100000US,,United States,0500000US36085,36085,United States - New York - Richmond County,Richmond County,1,1,1,1,60,1,1\n",
		"0100000US,,United States,0500000US36001,36001,United States - New York - Albany County,Albany County,1,1,1,1,500,1,1\n",
		"0100000US,,United States,0500000US36003,36003,United States - New York - Allegany County,Allegany County,1,1,1,1,200,1,1\n",
		"0100000US,,United States,0400000US46,46,United States - South Dakota,South Dakota,1,1,1,1,2000,1,1\n",
		"0100000US,,United States,0500000US46113,46113,United States - South Dakota - Shannon County,Shannon County,1,1,1,1,300,1,1\n",
		"0100000US,,United States,0500000US46003,46003,United States - South Dakota - Aurora County,Aurora County,1,1,1,1,100,1,1\n",
		"0100000US,,United States,0400000US72,72,United States - Puerto Rico,Puerto Rico,1,1,1,1,3500,1,1\n",
		"0100000US,,United States,0500000US72001,72001,United States - Puerto Rico - Adjuntas Municipio,Adjuntas Municipio,1,1,1,1,60,1,1\n",
	);

	pub(crate) fn table() -> CountyTable {
		CountyTable::from_census(CENSUS.as_bytes(), &GeoConfig::default()).unwrap()
	}

	static NYT: &str = concat!(
		"date,county,state,fips,cases,deaths\n",
		"2020-04-01,New York City,New York,,100,10\n",
		"2020-04-01,Albany,New York,36001,5,0\n",
		"2020-04-02,New York City,New York,,300,30\n",
		"2020-04-02,Albany,New York,36001,10,1\n",
		"2020-04-02,Unknown,New York,,20,0\n",
		"2020-04-02,Shannon,South Dakota,46113,3,0\n",
		"2020-04-02,Nowhere,Atlantis,,7,7\n",
		"2020-04-02,Somewhere,New York,99999,8,8\n",
	);

	fn day(d: u32) -> DayKey {
		DayKey::from_ymd(2020, 4, d).unwrap()
	}

	#[test]
	fn test_state_of() {
		assert_eq!(state_of("36061").unwrap().as_str(), "36999");
		assert!(state_of("3").is_none());
	}

	#[test]
	fn test_census_table() {
		let t = table();
		assert_eq!(t.name("36999"), Some("New York"));
		assert_eq!(t.state_fips("South Dakota").unwrap().as_str(), "46999");
		assert_eq!(t.area("36998"), Some(300.));
		assert_eq!(t.name("36998"), Some("New York City"));
		assert!(t.contains("46102"));
		assert!(!t.contains("46113"));
		let sd: Vec<&str> = t.counties_of("46999").iter().map(|f| f.as_str()).collect();
		assert_eq!(sd, vec!["46102", "46003"]);
		assert_eq!(t.counties_of("36999").len(), 7);
		assert_eq!(t.area("66999"), Some(212.));
		assert_eq!(t.state_fips("Guam").unwrap().as_str(), "66999");
		assert!(t.counties_of("60999").is_empty());
		assert_eq!(t.us_area(), 1460.);
	}

	#[test]
	fn test_census_rejects_bad_area() {
		let data = format!("{}{}", CENSUS, "0100000US,,United States,0500000US36007,36007,United States - New York - X,X,1,1,1,1,0,1,1\n");
		assert!(matches!(
			CountyTable::from_census(data.as_bytes(), &GeoConfig::default()),
			Err(Error::InvalidField{field: "area", ..})
		));
	}

	#[test]
	fn test_latest_day_is_kept() {
		let t = table();
		let d = load_county_day(&mut Quiet, NYT.as_bytes(), &t, &GeoConfig::default(), None).unwrap();
		assert_eq!(d.date, day(2));
		assert_eq!(d.value(CountyMetric::Cases, "36998"), 300.);
		assert_eq!(d.value(CountyMetric::Cases, "36001"), 10.);
		assert_eq!(d.value(CountyMetric::Cases, "46102"), 3.);
		assert_eq!(d.value(CountyMetric::Cases, "36061"), 0.);
		assert_eq!(d.unknown[CountyMetric::Cases].get("36999"), Some(&20));
		assert!(d.unknown[CountyMetric::Deaths].is_empty());
		assert_eq!(d.us_totals[CountyMetric::Cases], 313);
		assert_eq!(d.us_totals[CountyMetric::Deaths], 31);
		assert!(!d.values[CountyMetric::Cases].contains_key("99999"));
		// Kansas City parts are not in this census table
		assert!(!d.values[CountyMetric::Cases].contains_key("29095"));
		assert_eq!(d.total(CountyMetric::Cases), 313.);
		// combined entries count until they are split
		assert_eq!(d.max_per_area[CountyMetric::Cases], 1_000_000.);
	}

	#[test]
	fn test_requested_day() {
		let t = table();
		let d = load_county_day(&mut Quiet, NYT.as_bytes(), &t, &GeoConfig::default(), Some(day(1))).unwrap();
		assert_eq!(d.date, day(1));
		assert_eq!(d.value(CountyMetric::Cases, "36998"), 100.);
		assert_eq!(d.us_totals[CountyMetric::Cases], 105);
	}

	#[test]
	fn test_missing_requested_day_is_fatal() {
		let t = table();
		assert!(matches!(
			load_county_day(&mut Quiet, NYT.as_bytes(), &t, &GeoConfig::default(), Some(day(9))),
			Err(Error::DateNotFound(_))
		));
	}

	#[test]
	fn test_out_of_order_dates() {
		let data = "date,county,state,fips,cases,deaths\n2020-04-02,Albany,New York,36001,1,0\n2020-04-01,Albany,New York,36001,1,0\n";
		assert!(matches!(
			load_county_day(&mut Quiet, data.as_bytes(), &table(), &GeoConfig::default(), None),
			Err(Error::OutOfOrder{..})
		));
	}
}
