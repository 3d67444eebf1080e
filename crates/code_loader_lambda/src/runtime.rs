pub use code_loader_core::{contract, error, namespace};
