use std::time;

use log::{debug, info};


pub trait ProgressSink {
	fn update(&mut self, inow: usize);
	fn finish(&mut self, inow: usize);
}

/// Swallows all progress reports.
pub struct Quiet;

impl ProgressSink for Quiet {
	fn update(&mut self, _inow: usize) {}

	fn finish(&mut self, _inow: usize) {}
}


/// Counts processed rows of a single source and reports the rate.
pub struct CountMeter {
	label: &'static str,
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
}

impl CountMeter {
	pub fn start(label: &'static str) -> Self {
		let now = time::Instant::now();
		Self{
			label,
			t0: now,
			tprev: now,
			iprev: 0,
		}
	}
}

fn rate(n: usize, dt: f64) -> f64 {
	if dt > 0. {
		n as f64 / dt
	} else {
		0.
	}
}

impl ProgressSink for CountMeter {
	fn update(&mut self, inow: usize) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		debug!("{}: {:12} rows [{:8.2}/s]", self.label, inow, rate(inow.saturating_sub(self.iprev), dt));
		self.iprev = inow;
		self.tprev = now;
	}

	fn finish(&mut self, inow: usize) {
		let dt = self.t0.elapsed().as_secs_f64();
		info!("{}: {} rows in {:.2}s [{:.2}/s]", self.label, inow, dt, rate(inow, dt));
		self.iprev = inow;
	}
}


pub fn default_output(label: &'static str) -> Box<dyn ProgressSink> {
	Box::new(CountMeter::start(label))
}
