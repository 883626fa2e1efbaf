pub mod csv_table;
pub mod repo;
