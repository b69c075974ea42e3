use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::Error;
use super::geo::{CountyDay, CountyMetric, CountyTable, Fips};
use super::ioutil::create_with_parents;
use super::metric::{Metric, Variant};
use super::ranking::Ranking;
use super::snapshot::Snapshot;


fn format_value(variant: Variant, value: f64) -> String {
	match variant {
		Variant::Raw => format!("{:.0}", value),
		Variant::Normalized => format!("{:.2}", value),
	}
}

/// Two column `state,<type>` table in ranking order.
pub fn write_ranking<W: io::Write>(w: W, ranking: &Ranking) -> Result<(), Error> {
	let mut w = csv::Writer::from_writer(w);
	let type_name = ranking.type_name();
	w.write_record(&["state", type_name.as_str()])?;
	for entry in ranking.entries.iter() {
		let value = format_value(ranking.variant, entry.value);
		w.write_record(&[entry.region.as_str(), value.as_str()])?;
	}
	w.flush()?;
	Ok(())
}

/// Write every exported ranking below `dir`.
///
/// Each type gets `<type>/<type>-data.csv`, a dated copy in
/// `<type>/<YYYYMMDD>/` and a `.txt` copy for the web server. Returns the
/// paths of the main files.
pub fn export_rankings<P: AsRef<Path>>(snapshot: &Snapshot, dir: P) -> Result<Vec<PathBuf>, Error> {
	let dir = dir.as_ref();
	let mut written = Vec::new();
	for metric in Metric::RANKED.iter() {
		for variant in Variant::ALL.iter() {
			let ranking = snapshot.ranking(*metric, *variant);
			let type_name = ranking.type_name();
			let base = dir.join(&type_name);
			let main = base.join(format!("{}-data.csv", type_name));
			write_ranking(create_with_parents(&main)?, ranking)?;

			let dated = base.join(snapshot.current_date().to_string());
			fs::create_dir_all(&dated)?;
			fs::copy(&main, dated.join(format!("{}-data.csv", type_name)))?;
			fs::copy(&main, base.join(format!("{}-data.txt", type_name)))?;
			debug!("wrote {} ({} ranked)", main.display(), ranking.entries.len());
			written.push(main);
		}
	}
	Ok(written)
}

/// Per-day table `date,<region...>,US` of one metric, blank where a region
/// did not report.
pub fn write_series<W: io::Write>(w: W, snapshot: &Snapshot, metric: Metric) -> Result<(), Error> {
	let series = snapshot.series(metric);
	let national = snapshot.national(metric);
	let mut w = csv::Writer::from_writer(w);
	let mut header = vec!["date".to_string()];
	header.extend(series.keys().map(|k| k.to_string()));
	header.push("US".into());
	w.write_record(&header)?;

	let mut row = Vec::with_capacity(header.len());
	for (i, date) in snapshot.dates().iter().enumerate() {
		row.clear();
		row.push(date.to_string());
		for (_, v) in series.day(i) {
			row.push(v.map(|v| v.to_string()).unwrap_or_default());
		}
		row.push(national.get(i).map(|v| v.to_string()).unwrap_or_default());
		w.write_record(&row)?;
	}
	w.flush()?;
	Ok(())
}


/// One row per county with a value: raw values and values per scaled
/// square mile, as consumed by the map renderer.
pub fn write_county_values<W: io::Write>(w: W, day: &CountyDay, table: &CountyTable, scale: f64) -> Result<(), Error> {
	let mut w = csv::Writer::from_writer(w);
	w.write_record(&["fips", "name", "cases", "deaths", "cases_per_area", "deaths_per_area"])?;
	let mut fips: Vec<&Fips> = CountyMetric::ALL.iter().flat_map(|m| day.values[*m].keys()).collect();
	fips.sort();
	fips.dedup();
	for f in fips {
		let mut row = vec![f.to_string(), table.name(f).unwrap_or("").to_string()];
		for metric in CountyMetric::ALL.iter() {
			row.push(format!("{:.2}", day.value(*metric, f)));
		}
		for metric in CountyMetric::ALL.iter() {
			row.push(day.per_area(table, *metric, f, scale).map(|v| format!("{:.2}", v)).unwrap_or_default());
		}
		w.write_record(&row)?;
	}
	w.flush()?;
	Ok(())
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use crate::progress::Quiet;
	use crate::regions::RegionTable;
	use crate::states::{load_states, ColumnSchema, LoadOptions};

	fn snapshot() -> Snapshot {
		let mut t = RegionTable::new();
		t.insert("AA", "Alpha", 3_000_000, None).unwrap();
		t.insert("BB", "Bravo", 1_000_000, None).unwrap();
		let data = concat!(
			"date,state,positive,negative,pending,death\n",
			"20200402,AA,30,70,0,3\n",
			"20200401,AA,10,20,0,1\n",
			"20200401,BB,5,5,5,0\n",
		);
		let options = LoadOptions{schema: ColumnSchema::minimal(), ..LoadOptions::default()};
		let states = load_states(&mut Quiet, data.as_bytes(), &t, &options).unwrap();
		Snapshot::build(Arc::new(t), states, None).unwrap()
	}

	#[test]
	fn test_write_ranking_formats() {
		let s = snapshot();
		let mut buf = Vec::new();
		write_ranking(&mut buf, s.ranking(Metric::Cases, Variant::Raw)).unwrap();
		assert_eq!(String::from_utf8(buf).unwrap(), "state,cases\nAA,30\n");
		let mut buf = Vec::new();
		write_ranking(&mut buf, s.ranking(Metric::Tests, Variant::Normalized)).unwrap();
		assert_eq!(String::from_utf8(buf).unwrap(), "state,tests-norm\nAA,33.33\n");
	}

	#[test]
	fn test_write_series_leaves_missing_blank() {
		let s = snapshot();
		let mut buf = Vec::new();
		write_series(&mut buf, &s, Metric::Cases).unwrap();
		assert_eq!(
			String::from_utf8(buf).unwrap(),
			"date,AA,BB,US\n20200401,10,5,15\n20200402,30,,30\n",
		);
	}

	#[test]
	fn test_write_county_values() {
		let table = crate::geo::tests::table();
		let config = crate::geo::GeoConfig::default();
		let data = "date,county,state,fips,cases,deaths\n2020-04-01,Albany,New York,36001,50,1\n";
		let day = crate::geo::load_county_day(&mut Quiet, data.as_bytes(), &table, &config, None).unwrap();
		let mut buf = Vec::new();
		write_county_values(&mut buf, &day, &table, 1000.).unwrap();
		let text = String::from_utf8(buf).unwrap();
		assert!(text.starts_with("fips,name,cases,deaths,cases_per_area,deaths_per_area\n"));
		assert!(text.contains("36001,Albany County,50.00,1.00,100.00,2.00\n"));
		assert!(text.contains("36061,New York County,0.00,0.00,0.00,0.00\n"));
		assert!(!text.contains("29037"));
		assert!(!text.contains(",,"));
	}

	#[test]
	fn test_export_rankings_layout() {
		let s = snapshot();
		let tmp = tempfile::tempdir().unwrap();
		let dir = tmp.path();
		let written = export_rankings(&s, dir).unwrap();
		assert_eq!(written.len(), 6);
		assert!(dir.join("deaths-norm").join("deaths-norm-data.csv").is_file());
		assert!(dir.join("cases").join("20200402").join("cases-data.csv").is_file());
		let txt = fs::read_to_string(dir.join("cases").join("cases-data.txt")).unwrap();
		assert_eq!(txt, "state,cases\nAA,30\n");
		assert_eq!(written[0], dir.join("tests").join("tests-data.csv"));
	}
}
