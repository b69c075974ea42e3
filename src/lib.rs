mod date;
mod derived;
mod error;
mod export;
mod geo;
mod ioutil;
mod metric;
mod national;
mod progress;
mod ranking;
mod redistribute;
mod regions;
mod snapshot;
mod states;
mod timeseries;

pub use date::*;
pub use derived::*;
pub use error::*;
pub use export::*;
pub use geo::*;
pub use ioutil::{magic_open, create_with_parents};
pub use metric::*;
pub use national::*;
pub use progress::*;
pub use ranking::*;
pub use redistribute::*;
pub use regions::*;
pub use snapshot::*;
pub use states::*;
pub use timeseries::*;
