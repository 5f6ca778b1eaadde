pub mod controller;

pub use controller::RecordingSession;
