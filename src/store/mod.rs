pub mod arena;
pub mod bucket;
pub mod table;
