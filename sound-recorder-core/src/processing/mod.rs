pub mod bounded_buffer;
pub mod drain;
pub mod mixer;
pub mod samples;
pub mod wav_format;
