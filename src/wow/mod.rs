pub mod data_tables;
