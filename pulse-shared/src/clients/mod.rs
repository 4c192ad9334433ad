pub mod clickhouse;
pub mod db;
pub mod email;
pub mod redis;
