pub mod capture_source;
pub mod encoder_sink;
pub mod recorder;
pub mod recorder_delegate;
