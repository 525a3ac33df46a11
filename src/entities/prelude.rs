pub use super::farmers::Entity as Farmers;
pub use super::grant_applications::Entity as GrantApplications;
pub use super::query_cache::Entity as QueryCache;
