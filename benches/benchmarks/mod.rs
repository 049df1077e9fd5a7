pub mod measure;
pub mod quantize;
pub mod rope;
