pub mod js_runtime;
pub mod object_store;
