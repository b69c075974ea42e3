use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use serde::{de, Deserialize, Deserializer};


/// Canonical day key of every series, ordered chronologically.
///
/// The key renders as the 8-digit `YYYYMMDD` form used by the state daily
/// source; the ISO forms of the other sources are accepted on input.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

static MONTHS: [&str; 12] = [
	"Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl DayKey {
	pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
		Some(Self(NaiveDate::from_ymd_opt(year, month, day)?))
	}

	/// The numeric `YYYYMMDD` value.
	pub fn value(&self) -> u32 {
		// years before 0 cannot be produced by the parser
		(self.0.year() as u32) * 10000 + self.0.month() * 100 + self.0.day()
	}

	/// Human readable form, e.g. `5 Apr 2020`.
	pub fn long_label(&self) -> String {
		format!("{} {} {}", self.0.day(), MONTHS[self.0.month0() as usize], self.0.year())
	}
}

impl From<NaiveDate> for DayKey {
	fn from(other: NaiveDate) -> Self {
		Self(other)
	}
}

impl From<DayKey> for NaiveDate {
	fn from(other: DayKey) -> Self {
		other.0
	}
}

impl fmt::Display for DayKey {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:04}{:02}{:02}", self.0.year(), self.0.month(), self.0.day())
	}
}


#[derive(Debug, Clone)]
pub enum ParseDayKeyError {
	InvalidLength(usize),
	InvalidNumber(ParseIntError),
	InvalidDate,
}

impl fmt::Display for ParseDayKeyError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::InvalidLength(n) => write!(f, "invalid length {} for date, must be 8, 10 or 19 bytes", n),
			Self::InvalidNumber(e) => fmt::Display::fmt(e, f),
			Self::InvalidDate => f.write_str("not a calendar date"),
		}
	}
}

impl From<ParseIntError> for ParseDayKeyError {
	fn from(other: ParseIntError) -> Self {
		Self::InvalidNumber(other)
	}
}

impl std::error::Error for ParseDayKeyError {}


impl FromStr for DayKey {
	type Err = ParseDayKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if !s.is_ascii() {
			return Err(ParseDayKeyError::InvalidDate)
		}
		let b = s.as_bytes();
		let (year, month, day) = match s.len() {
			// 20200415
			8 => (&s[0..4], &s[4..6], &s[6..8]),
			// 2020-04-15, 2020-04-15T17:00:00 or 2020-04-15 17:00:00
			n @ 10 | n @ 19 => {
				if b[4] != b'-' || b[7] != b'-' || (n == 19 && b[10] != b'T' && b[10] != b' ') {
					return Err(ParseDayKeyError::InvalidDate)
				}
				(&s[0..4], &s[5..7], &s[8..10])
			},
			n => return Err(ParseDayKeyError::InvalidLength(n)),
		};
		if !year.bytes().chain(month.bytes()).chain(day.bytes()).all(|c| c.is_ascii_digit()) {
			return Err(ParseDayKeyError::InvalidDate)
		}
		let year = year.parse::<i32>()?;
		let month = month.parse::<u32>()?;
		let day = day.parse::<u32>()?;
		Self::from_ymd(year, month, day).ok_or(ParseDayKeyError::InvalidDate)
	}
}

impl<'de> Deserialize<'de> for DayKey {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where D: Deserializer<'de>
	{
		let s = String::deserialize(deserializer)?;
		FromStr::from_str(&s).map_err(de::Error::custom)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_compact_form() {
		let d: DayKey = "20200415".parse().unwrap();
		assert_eq!(d.value(), 20200415);
		assert_eq!(d.to_string(), "20200415");
	}

	#[test]
	fn test_parse_iso_and_timestamp_forms() {
		let a: DayKey = "2020-04-15".parse().unwrap();
		let b: DayKey = "2020-04-15T17:00:00".parse().unwrap();
		let c: DayKey = "2020-04-15 17:00:00".parse().unwrap();
		assert_eq!(a, b);
		assert_eq!(b, c);
		assert_eq!(a.value(), 20200415);
	}

	#[test]
	fn test_parse_rejects_garbage() {
		assert!("2020041".parse::<DayKey>().is_err());
		assert!("20201341".parse::<DayKey>().is_err());
		assert!("2020ab15".parse::<DayKey>().is_err());
	}

	#[test]
	fn test_parse_checks_separators_and_sign() {
		assert!("2020x04y15".parse::<DayKey>().is_err());
		assert!("2020-04-15X17:00:00".parse::<DayKey>().is_err());
		assert!("+020-04-15".parse::<DayKey>().is_err());
		assert!("+0200415".parse::<DayKey>().is_err());
		assert!("2020-+4-15".parse::<DayKey>().is_err());
	}

	#[test]
	fn test_ordering_is_chronological() {
		let a = DayKey::from_ymd(2020, 3, 31).unwrap();
		let b = DayKey::from_ymd(2020, 4, 1).unwrap();
		assert!(a < b);
		assert!(a.value() < b.value());
	}

	#[test]
	fn test_long_label() {
		let d = DayKey::from_ymd(2020, 4, 5).unwrap();
		assert_eq!(d.long_label(), "5 Apr 2020");
	}
}
