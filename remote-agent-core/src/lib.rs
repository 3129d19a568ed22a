pub mod audit;
pub mod events;
pub mod executor;
pub mod frame_streamer;
pub mod kill_switch;
pub mod pairing;
pub mod queue;
pub mod rate_limit;
pub mod services;
pub mod session;

pub use services::Coordinator;
