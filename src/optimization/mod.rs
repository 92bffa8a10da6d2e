pub mod icp;
pub mod procrustes;

pub use icp::*;
pub use procrustes::*;
