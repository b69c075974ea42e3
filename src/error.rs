use std::fmt;
use std::io;

use smartstring::alias::{String as SmartString};

use super::date::DayKey;


#[derive(Debug)]
pub enum Error {
	Io(io::Error),
	Csv(csv::Error),
	/// A reference table entry with a population of zero.
	InvalidPopulation{region: SmartString},
	/// The same identifier appears twice in a reference table.
	DuplicateRegion{region: SmartString},
	/// The same region reports twice for one date.
	DuplicateRecord{date: DayKey, region: SmartString},
	/// A date appeared in a position its source ordering forbids.
	OutOfOrder{previous: DayKey, found: DayKey},
	/// The source produced no usable rows.
	NoData,
	/// The region snapshot and the national reference end on different dates.
	DateMismatch{regions: DayKey, reference: Option<DayKey>},
	/// A requested processing date does not occur in the source.
	DateNotFound(DayKey),
	/// Removing another day would leave fewer than two dates.
	TruncationFloor{remaining: usize},
	InvalidField{field: &'static str, value: String},
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Io(e) => fmt::Display::fmt(e, f),
			Self::Csv(e) => fmt::Display::fmt(e, f),
			Self::InvalidPopulation{region} => write!(f, "population of {} must be positive", region),
			Self::DuplicateRegion{region} => write!(f, "region {} defined more than once", region),
			Self::DuplicateRecord{date, region} => write!(f, "duplicate record for {} on {}", region, date),
			Self::OutOfOrder{previous, found} => write!(f, "date {} out of order after {}", found, previous),
			Self::NoData => f.write_str("no data rows in source"),
			Self::DateMismatch{regions, reference: Some(reference)} => write!(f, "region and reference data not consistent: reference={} vs regions={}", reference, regions),
			Self::DateMismatch{regions, reference: None} => write!(f, "reference data has no rows up to {}", regions),
			Self::DateNotFound(date) => write!(f, "unable to find data for {}", date),
			Self::TruncationFloor{remaining} => write!(f, "cannot remove a day with only {} date(s) left", remaining),
			Self::InvalidField{field, value} => write!(f, "invalid value {:?} for {}", value, field),
		}
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<csv::Error> for Error {
	fn from(err: csv::Error) -> Self {
		Self::Csv(err)
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			Self::Csv(e) => Some(e),
			_ => None,
		}
	}
}
