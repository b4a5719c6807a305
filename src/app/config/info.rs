pub const APP_NAME: &str = "clipstitch";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
