pub mod authenticate;
pub mod editor;
pub mod status;
