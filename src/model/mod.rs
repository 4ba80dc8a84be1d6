pub mod candle;
pub mod daily;
pub mod element;
pub mod merged;
