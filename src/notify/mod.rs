pub mod colour;
pub mod escpos;
pub mod sink;
pub mod ticket;

pub use sink::Sink;
pub use ticket::render;
