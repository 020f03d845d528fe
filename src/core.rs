pub mod battery;
pub mod cross_day;
pub mod ems_window;
pub mod error;
pub mod evening;
pub mod interval;
pub mod mode;
pub mod overlap;
pub mod period;
pub mod planner;
pub mod schema;
pub mod series;
pub mod settings;
pub mod trim;
pub mod window;
