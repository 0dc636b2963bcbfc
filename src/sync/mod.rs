pub mod rwlock;
pub mod worker_pool;
