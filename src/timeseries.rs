use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;


pub trait TimeSeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> TimeSeriesKey for T {}


/// Value of one key on one day. `None` means nothing was reported, which is
/// different from a reported zero.
pub type Sample = Option<u64>;


/// A set of equally long day-indexed series, one per key.
///
/// Days are appended for all keys at once, so every series always has the
/// same length. Keys keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T: Hash + Eq, V: Copy> {
	keys: HashMap<T, usize>,
	order: Vec<T>,
	time_series: Vec<Vec<V>>,
	len: usize,
}

impl<T: TimeSeriesKey, V: Copy> TimeSeries<T, V> {
	pub fn new<I: IntoIterator<Item = T>>(keys: I) -> Self {
		let mut result = Self{
			keys: HashMap::new(),
			order: Vec::new(),
			time_series: Vec::new(),
			len: 0,
		};
		for k in keys {
			if result.keys.contains_key(&k) {
				continue
			}
			result.keys.insert(k.clone(), result.order.len());
			result.order.push(k);
			result.time_series.push(Vec::new());
		}
		result
	}

	/// Number of days.
	#[inline(always)]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	#[inline(always)]
	pub fn key_count(&self) -> usize {
		self.order.len()
	}

	pub fn keys(&self) -> std::slice::Iter<'_, T> {
		self.order.iter()
	}

	pub fn get_index<Q>(&self, k: &Q) -> Option<usize>
		where T: Borrow<Q>, Q: Hash + Eq + ?Sized
	{
		Some(*self.keys.get(k)?)
	}

	pub fn get<Q>(&self, k: &Q) -> Option<&[V]>
		where T: Borrow<Q>, Q: Hash + Eq + ?Sized
	{
		let index = self.get_index(k)?;
		Some(&self.time_series[index][..])
	}

	pub fn get_value<Q>(&self, k: &Q, i: usize) -> Option<V>
		where T: Borrow<Q>, Q: Hash + Eq + ?Sized
	{
		if i >= self.len {
			return None
		}
		self.get(k).map(|v| v[i])
	}

	pub fn last<Q>(&self, k: &Q) -> Option<V>
		where T: Borrow<Q>, Q: Hash + Eq + ?Sized
	{
		self.get(k)?.last().copied()
	}

	/// Series in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&T, &[V])> + '_ {
		self.order.iter().zip(self.time_series.iter().map(|v| &v[..]))
	}

	/// All values of day `i`, in key order.
	pub fn day(&self, i: usize) -> impl Iterator<Item = (&T, V)> + '_ {
		let i = if i < self.len { Some(i) } else { None };
		self.order.iter().zip(self.time_series.iter()).filter_map(move |(k, v)| {
			Some((k, v[i?]))
		})
	}

	/// Append one day. `values` holds one value per key, in key order.
	pub fn push_day(&mut self, values: &[V]) {
		assert_eq!(values.len(), self.order.len());
		for (vec, v) in self.time_series.iter_mut().zip(values.iter()) {
			vec.push(*v);
		}
		self.len += 1;
	}

	/// Remove the last day from every series.
	pub fn pop_day(&mut self) -> bool {
		if self.len == 0 {
			return false
		}
		for vec in self.time_series.iter_mut() {
			vec.pop();
		}
		self.len -= 1;
		true
	}

	/// Reverse the day order of every series.
	///
	/// Sources listing the most recent day first are accumulated in reading
	/// order and flipped once at the end.
	pub fn reverse_days(&mut self) {
		for vec in self.time_series.iter_mut() {
			vec.reverse();
		}
	}
}

impl<T: TimeSeriesKey> TimeSeries<T, Sample> {
	/// Sum over all keys which reported on day `i`.
	pub fn sum_reported(&self, i: usize) -> u64 {
		self.day(i).filter_map(|(_, v)| v).sum()
	}

	pub fn count_missing(&self, i: usize) -> usize {
		self.day(i).filter(|(_, v)| v.is_none()).count()
	}
}


pub type Samples<T> = TimeSeries<T, Sample>;
