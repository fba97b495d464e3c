pub mod order_details;

pub use order_details::{ItemSnapshot, OrderDetails, OrderLine};
