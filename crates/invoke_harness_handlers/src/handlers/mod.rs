pub mod context_file;
pub mod crash;
pub mod echo;
pub mod greeting;
pub mod helloworld;
