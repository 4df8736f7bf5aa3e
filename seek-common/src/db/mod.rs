//! SQLite datastore for common names and the species collection

pub mod common_names;
pub mod init;
pub mod observations;

pub use common_names::{common_name, load_common_names, CommonNameRow};
pub use init::{init_database, init_memory_database};
pub use observations::{add_observation, first_seen_date, observation_count, NewObservation};
