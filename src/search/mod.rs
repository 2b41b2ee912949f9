pub mod executor;
pub mod highlight;
pub mod request;
pub mod results;
pub mod scroll;
pub mod sort;
pub mod source;
