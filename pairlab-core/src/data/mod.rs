//! Data acquisition: providers, the CSV cache, synthetic generation and
//! multi-asset date alignment.

pub mod align;
pub mod csv_store;
pub mod provider;
pub mod synthetic;

pub use align::{align_common_dates, AlignedCloses};
pub use csv_store::{cache_file_name, convert_csv, ConvertSummary, CsvStore, DEFAULT_TIMEFRAME};
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
pub use synthetic::{cointegrated_pair, SyntheticProvider};
