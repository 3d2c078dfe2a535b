pub mod console;
pub mod error;
pub mod menu;
pub mod state;

pub use console::Console;
pub use error::AppError;
pub use menu::run;
pub use state::AppState;
