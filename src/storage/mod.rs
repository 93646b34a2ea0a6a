pub mod accounts;
pub mod corpus;
pub mod name_map;

pub use accounts::{AccountRecord, AccountStore, AccountUpdate, FileAccountStore};
pub use corpus::{CorpusScanner, Dataset};
pub use name_map::{NameMap, UNKNOWN_LABEL};
