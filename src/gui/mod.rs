//! GUI module for the graphical user interface

mod app;

pub use app::VcommApp;
