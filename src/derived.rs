use std::num::NonZeroU64;

use num_traits::ToPrimitive;

use super::metric::Variant;
use super::timeseries::Sample;


pub const PER_MILLION: f64 = 1_000_000.;

/// Weights of the 1, 2 and 3 day estimates in the doubling time average.
static DOUBLING_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];


/// Scale `value` to a per million residents basis.
pub fn normalize<V: ToPrimitive>(value: V, population: NonZeroU64) -> f64 {
	value.to_f64().unwrap_or(f64::NAN) * PER_MILLION / population.get() as f64
}


/// Doubling time in days of a cumulative series, averaged over the last
/// three days.
///
/// `None` if there are fewer than four values or if the growth over any of
/// the three windows is not a positive, finite log ratio.
pub fn doubling_rate<V: ToPrimitive + Copy>(values: &[V]) -> Option<f64> {
	let n = values.len();
	if n < 4 {
		return None
	}
	let curr = values[n - 1].to_f64()?;
	if !(curr > 0.) {
		return None
	}
	let ln2 = 2f64.ln();
	let ln_curr = curr.ln();
	let mut avg = 0.;
	for (i, weight) in DOUBLING_WEIGHTS.iter().enumerate() {
		let delta = i + 1;
		let past = values[n - 1 - delta].to_f64()?;
		if !(past > 0.) {
			return None
		}
		let lndata = ln_curr - past.ln();
		if lndata == 0. {
			// flat series, the doubling time is unbounded
			return None
		}
		avg += weight * (delta as f64) * (ln2 / lndata);
	}
	if avg.is_finite() {
		Some(avg)
	} else {
		None
	}
}

/// Doubling time of a region series; undefined if any of the last four days
/// is missing.
pub fn doubling_rate_samples(samples: &[Sample]) -> Option<f64> {
	if samples.len() < 4 {
		return None
	}
	let tail: Vec<u64> = samples[samples.len() - 4..].iter().copied().collect::<Option<_>>()?;
	doubling_rate(&tail[..])
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryRequest {
	pub variant: Variant,
	/// Keep only values at or above this level.
	pub threshold: Option<f64>,
}

/// The reported, non-zero values of a series, optionally normalized and cut
/// at a threshold.
pub fn trajectory(samples: &[Sample], population: NonZeroU64, request: &TrajectoryRequest) -> Vec<f64> {
	let mut result = Vec::with_capacity(samples.len());
	for v in samples.iter() {
		let v = match v {
			Some(v) if *v != 0 => *v,
			_ => continue,
		};
		let v = match request.variant {
			Variant::Raw => v as f64,
			Variant::Normalized => normalize(v, population),
		};
		match request.threshold {
			Some(threshold) if v < threshold => continue,
			_ => (),
		};
		result.push(v);
	}
	result
}

/// Last value of a trajectory and its change since the previous point.
pub fn latest_with_delta(values: &[f64]) -> (f64, f64) {
	match values {
		[] => (0., 0.),
		[only] => (*only, *only),
		[.., prev, last] => (*last, *last - *prev),
	}
}
