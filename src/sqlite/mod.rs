// SQLite engine module:
// - config: pool construction and pragma setup
// - executor: statement execution via the deadpool worker
// - query: result extraction and building

pub mod config;
pub mod executor;
pub mod query;

pub use config::build_pool;
pub use executor::{execute_batch, execute_dml, execute_select, insert_rowid};
pub use query::build_result_set;
