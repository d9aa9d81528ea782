mod ordered;

pub use ordered::*;
