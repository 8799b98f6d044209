pub mod postgres;
pub mod sqlite;
pub mod storage;
pub mod value;
