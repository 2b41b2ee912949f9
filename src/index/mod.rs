pub mod collection;
pub mod documents;
