mod fjall_wrapper;

pub use fjall_wrapper::FjallWrapper;
