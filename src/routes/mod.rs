mod broadcast;
mod health_check;
mod index;
mod load_template;
mod preview_recipients;

pub use broadcast::*;
pub use health_check::*;
pub use index::*;
pub use load_template::*;
pub use preview_recipients::*;
