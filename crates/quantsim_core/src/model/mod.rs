mod density;
mod stable;

pub use density::StandardStable;
pub use stable::StableParams;
