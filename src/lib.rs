pub mod analyzers;
pub mod clean;
pub mod features;
pub mod fetch;
pub mod model;
pub mod output;
