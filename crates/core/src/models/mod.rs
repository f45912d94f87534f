pub mod collection;
pub mod dataset;
pub mod query;
pub mod record;
pub mod series;
pub mod settings;
pub mod stock_row;
