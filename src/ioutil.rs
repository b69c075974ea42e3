use std::io;
use std::io::Read;
use std::fs;
use std::path::Path;

use flate2;


pub fn magic_open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	match path.extension() {
		Some(x) if x == "gz" => {
			Ok(Box::new(flate2::read::GzDecoder::new(fs::File::open(path)?)))
		},
		_ => Ok(Box::new(fs::File::open(path)?)),
	}
}

/// CSV reader as used for every upstream source.
///
/// Rows are allowed to carry a different number of fields than the header;
/// upstream providers add columns over time and we only access known names.
pub fn csv_reader<R: Read>(r: R) -> csv::Reader<R> {
	csv::ReaderBuilder::new()
		.trim(csv::Trim::All)
		.flexible(true)
		.from_reader(r)
}

pub fn create_with_parents<P: AsRef<Path>>(path: P) -> io::Result<fs::File> {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::File::create(path)
}
