pub mod course;
pub mod enrollment;
pub mod material;
pub mod profile;
pub mod user;
pub mod video;
