//! Tasks that make up the application as well as the resources they use.
pub mod buttons;
pub mod buzzer;
pub mod display;
pub mod link;
pub mod orchestrate;
pub mod resources;
