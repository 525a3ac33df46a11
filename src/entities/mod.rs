pub mod prelude;

pub mod farmers;
pub mod grant_applications;
pub mod query_cache;
