pub mod config;
pub mod delta;
pub mod error;
pub mod form;
pub mod logging;
pub mod model;
pub mod ols;
pub mod optimizer;
pub mod simulate;
pub mod source;
pub mod sqlite_source;
pub mod table;
pub mod trainer;
pub mod tuning;
