pub mod booking;
pub mod loyalty;

pub use booking::BookingRepository;
pub use loyalty::LoyaltyRepository;
