//! Catalogue entity hierarchy: server → database → table → column.
//!
//! Uniqueness is enforced by the migration: server name globally, database
//! name per server, (schema, table) per database and lower-cased column name
//! per table.

pub mod catalogue_columns;
pub mod catalogue_databases;
pub mod catalogue_tables;
pub mod servers;
