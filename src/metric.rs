use std::fmt;

use enum_map::Enum;


/// Per-state quantities derived from one daily record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum Metric {
	/// positive + negative
	Tests,
	/// positive + negative + pending
	TestsWithPending,
	Cases,
	Deaths,
}

impl Metric {
	pub const ALL: [Metric; 4] = [Metric::Tests, Metric::TestsWithPending, Metric::Cases, Metric::Deaths];

	/// Metrics whose rankings are handed to the report collaborators.
	pub const RANKED: [Metric; 3] = [Metric::Tests, Metric::Cases, Metric::Deaths];

	pub fn slug(&self) -> &'static str {
		match self {
			Self::Tests => "tests",
			Self::TestsWithPending => "tests-pnp",
			Self::Cases => "cases",
			Self::Deaths => "deaths",
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Tests => "Tests",
			Self::TestsWithPending => "Tests (incl. pending)",
			Self::Cases => "Positive Cases",
			Self::Deaths => "Deaths",
		}
	}
}

impl fmt::Display for Metric {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.slug())
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum Variant {
	Raw,
	/// Scaled to a per million residents basis.
	Normalized,
}

impl Variant {
	pub const ALL: [Variant; 2] = [Variant::Raw, Variant::Normalized];

	/// Export type name, e.g. `cases` or `cases-norm`.
	pub fn type_name(&self, metric: Metric) -> String {
		match self {
			Self::Raw => metric.slug().into(),
			Self::Normalized => format!("{}-norm", metric.slug()),
		}
	}
}
