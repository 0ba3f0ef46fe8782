pub mod delimited_table;
pub mod ndjson_table;
pub mod records;
pub mod sample;

pub use delimited_table::DelimitedTableSource;
pub use ndjson_table::NdjsonTableSource;
pub use records::TableRow;
pub use sample::StaticSource;
