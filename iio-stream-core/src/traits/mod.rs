pub mod board_profile;
pub mod stream_backend;
pub mod stream_delegate;
