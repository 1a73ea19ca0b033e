mod consumer;
mod producer;

pub use consumer::Consumer;
pub use producer::Producer;
