pub mod audio;
pub mod fetch;
pub mod http;
pub mod mutations;
