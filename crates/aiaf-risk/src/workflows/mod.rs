pub mod assessment;
pub mod sheets;
