use std::collections::HashMap;
use std::io;
use std::num::NonZeroU64;

use serde::Deserialize;

use smartstring::alias::{String as SmartString};

use super::error::Error;
use super::ioutil::csv_reader;

pub type RegionId = SmartString;


#[derive(Debug, Clone, PartialEq)]
pub struct RegionInfo {
	pub id: RegionId,
	pub name: String,
	pub population: NonZeroU64,
	/// Land area in square miles, if known.
	pub area: Option<f64>,
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawRegionRow {
	pub region: RegionId,
	pub name: String,
	pub population: u64,
	#[serde(default)]
	pub area: Option<f64>,
}


/// Static region universe of a run.
///
/// Iteration order is insertion order. Ranking ties are resolved by this
/// order, so it is part of the observable behaviour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTable {
	regions: Vec<RegionInfo>,
	index: HashMap<RegionId, usize>,
}

impl RegionTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, id: &str, name: &str, population: u64, area: Option<f64>) -> Result<usize, Error> {
		if self.index.contains_key(id) {
			return Err(Error::DuplicateRegion{region: id.into()})
		}
		let info = Self::validated(id, name, population, area)?;
		let i = self.regions.len();
		self.index.insert(info.id.clone(), i);
		self.regions.push(info);
		Ok(i)
	}

	/// Replace the attributes of a known region or append a new one.
	///
	/// Used for the handful of combined or renumbered regions which the
	/// upstream tables get wrong.
	pub fn apply_override(&mut self, id: &str, name: &str, population: u64, area: Option<f64>) -> Result<usize, Error> {
		match self.index_of(id) {
			Some(i) => {
				self.regions[i] = Self::validated(id, name, population, area)?;
				Ok(i)
			},
			None => self.insert(id, name, population, area),
		}
	}

	fn validated(id: &str, name: &str, population: u64, area: Option<f64>) -> Result<RegionInfo, Error> {
		let population = match NonZeroU64::new(population) {
			Some(v) => v,
			None => return Err(Error::InvalidPopulation{region: id.into()}),
		};
		match area {
			Some(a) if !(a > 0.) => return Err(Error::InvalidField{field: "area", value: a.to_string()}),
			_ => (),
		};
		Ok(RegionInfo{
			id: id.into(),
			name: name.into(),
			population,
			area,
		})
	}

	pub fn from_reader<R: io::Read>(r: R) -> Result<Self, Error> {
		let mut table = Self::new();
		let mut r = csv_reader(r);
		for row in r.deserialize() {
			let rec: RawRegionRow = row?;
			table.insert(&rec.region, &rec.name, rec.population, rec.area)?;
		}
		if table.is_empty() {
			return Err(Error::NoData)
		}
		Ok(table)
	}

	/// Apply a `region,name,population[,area]` override table on top of this
	/// one. Returns the number of rows applied.
	pub fn apply_overrides<R: io::Read>(&mut self, r: R) -> Result<usize, Error> {
		let mut r = csv_reader(r);
		let mut n = 0;
		for row in r.deserialize() {
			let rec: RawRegionRow = row?;
			self.apply_override(&rec.region, &rec.name, rec.population, rec.area)?;
			n += 1;
		}
		Ok(n)
	}

	/// US states, DC and the five inhabited territories, 2019 estimates.
	pub fn us_states() -> Result<Self, Error> {
		let mut table = Self::new();
		for (id, name, population) in US_STATES.iter() {
			table.insert(id, name, *population, None)?;
		}
		Ok(table)
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.regions.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.regions.is_empty()
	}

	pub fn index_of(&self, id: &str) -> Option<usize> {
		Some(*self.index.get(id)?)
	}

	pub fn get(&self, id: &str) -> Option<&RegionInfo> {
		Some(&self.regions[self.index_of(id)?])
	}

	pub fn at(&self, i: usize) -> Option<&RegionInfo> {
		self.regions.get(i)
	}

	pub fn population(&self, id: &str) -> Option<NonZeroU64> {
		Some(self.get(id)?.population)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, RegionInfo> {
		self.regions.iter()
	}

	pub fn ids(&self) -> impl Iterator<Item = &RegionId> + '_ {
		self.regions.iter().map(|r| &r.id)
	}
}


static US_STATES: [(&str, &str, u64); 56] = [
	("AK", "Alaska", 731545),
	("AL", "Alabama", 4903185),
	("AR", "Arkansas", 3017804),
	("AS", "American Samoa", 55641),
	("AZ", "Arizona", 7278717),
	("CA", "California", 39512223),
	("CO", "Colorado", 5758736),
	("CT", "Connecticut", 3565287),
	("DC", "District of Columbia", 705749),
	("DE", "Delaware", 973764),
	("FL", "Florida", 21477737),
	("GA", "Georgia", 10617423),
	("GU", "Guam", 165718),
	("HI", "Hawaii", 1415872),
	("IA", "Iowa", 3155070),
	("ID", "Idaho", 1787065),
	("IL", "Illinois", 12671821),
	("IN", "Indiana", 6732219),
	("KS", "Kansas", 2913314),
	("KY", "Kentucky", 4467673),
	("LA", "Louisiana", 4648794),
	("MA", "Massachusetts", 6892503),
	("MD", "Maryland", 6045680),
	("ME", "Maine", 1344212),
	("MI", "Michigan", 9986857),
	("MN", "Minnesota", 5639632),
	("MO", "Missouri", 6137428),
	("MP", "Northern Mariana Islands", 55194),
	("MS", "Mississippi", 2976149),
	("MT", "Montana", 1068778),
	("NC", "North Carolina", 10488084),
	("ND", "North Dakota", 762062),
	("NE", "Nebraska", 1934408),
	("NH", "New Hampshire", 1359711),
	("NJ", "New Jersey", 8882190),
	("NM", "New Mexico", 2096829),
	("NV", "Nevada", 3080156),
	("NY", "New York", 19453561),
	("OH", "Ohio", 11689100),
	("OK", "Oklahoma", 3956971),
	("OR", "Oregon", 4217737),
	("PA", "Pennsylvania", 12801989),
	("PR", "Puerto Rico", 3193694),
	("RI", "Rhode Island", 1059361),
	("SC", "South Carolina", 5148714),
	("SD", "South Dakota", 884659),
	("TN", "Tennessee", 6829174),
	("TX", "Texas", 28995881),
	("UT", "Utah", 3205958),
	("VA", "Virginia", 8535519),
	("VI", "Virgin Islands", 104914),
	("VT", "Vermont", 623989),
	("WA", "Washington", 7614893),
	("WI", "Wisconsin", 5822434),
	("WV", "West Virginia", 1792147),
	("WY", "Wyoming", 578759),
];
