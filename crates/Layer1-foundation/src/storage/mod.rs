//! Storage - JSON 파일 기반 저장소

mod json;

pub use json::JsonStore;
