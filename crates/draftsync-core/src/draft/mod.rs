pub mod ingest;
pub mod player;
pub mod ranking;
pub mod registry;
pub mod resolver;
pub mod rows;
pub mod seed;
pub mod slots;
pub mod teams;
