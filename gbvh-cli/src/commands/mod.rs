pub mod extract;
pub mod info;
pub mod pack;
pub mod sections;
