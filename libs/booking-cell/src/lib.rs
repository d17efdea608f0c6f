pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use models::*;
pub use services::lifecycle::BookingLifecycleService;
pub use services::reservation::ReservationService;
