pub mod freshness;
pub use freshness::{Freshness, Lookup};

pub mod cache_service;
pub mod cache_service_impl;
pub use cache_service::{
    CacheService, ChartCalculator, Computation, FillRequest, Served, ServedFrom,
};
pub use cache_service_impl::SeaOrmCacheService;

pub mod profile_service;
pub mod profile_service_impl;
pub use profile_service::{CreateProfileRequest, ProfileDto, ProfileError, ProfileService};
pub use profile_service_impl::SeaOrmProfileService;

pub mod sweep;
pub use sweep::Scheduler;
