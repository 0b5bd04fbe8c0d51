mod replay;

pub use replay::{ReplayConfig, ReplayProtector};
