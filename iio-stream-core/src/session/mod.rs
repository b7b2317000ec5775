pub mod io;
pub mod stop_signal;
pub mod stream;
