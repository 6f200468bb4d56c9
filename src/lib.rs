pub mod activity;
pub mod errors;
pub mod executor;
pub mod forge_pass;
pub mod gates;
pub mod git;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod plugins;
pub mod review;
pub mod summary;
pub mod ui;
