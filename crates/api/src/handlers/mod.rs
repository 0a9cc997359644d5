pub mod creatives;
pub mod formats;
