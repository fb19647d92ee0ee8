mod client;
mod controller;
mod coordinator;
mod view;

pub use client::*;
pub use controller::*;
pub use coordinator::*;
pub use view::*;
