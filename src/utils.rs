pub mod position;
pub mod uri;
