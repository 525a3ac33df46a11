pub mod scheduler;
pub use scheduler::SyncScheduler;

pub mod search_service;
pub use search_service::{SearchError, SearchService};

pub mod search_service_impl;
pub use search_service_impl::{CachePolicy, CachedSearchService};

pub mod suggestions;
pub use suggestions::SuggestionSource;

pub mod sync;
pub use sync::{IndexSynchronizer, SyncError, SyncReport};
