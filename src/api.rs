pub mod battery;
pub mod client;
pub mod ems;
pub mod foxess;
pub mod heartbeat;
pub mod home_assistant;
pub mod price_feed;
