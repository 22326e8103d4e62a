pub mod factors;
pub mod request;
pub mod result;
