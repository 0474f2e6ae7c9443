pub mod error;
pub mod extract;
pub mod pagination;
pub mod response;
pub mod timezone;
pub mod validated_json;
