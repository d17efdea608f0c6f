pub mod duplicate;
pub mod lifecycle;
pub mod lock;
pub mod reservation;

pub use lifecycle::BookingLifecycleService;
pub use lock::{SlotLockKey, SlotLockService};
pub use reservation::ReservationService;
