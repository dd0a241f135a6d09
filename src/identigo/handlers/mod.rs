pub mod health;
pub use self::health::health;

pub mod register;
pub use self::register::register;
