// PostgreSQL engine module:
// - config: pool construction from DbConfig
// - executor: statement execution on a pooled client
// - query: result extraction and building

pub mod config;
pub mod executor;
pub mod query;

pub use config::build_pool;
pub use executor::{execute_batch, execute_dml, execute_select, insert_returning};
pub use query::build_result_set;
