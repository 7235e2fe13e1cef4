pub mod pool;
pub mod queries;
pub mod sites;

pub use pool::create_pool;
