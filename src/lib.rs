// Post Curator - Library Entry Point

pub mod constants;
pub mod error;
pub mod db;
pub mod scoring;
pub mod curate;
