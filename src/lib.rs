//src/lib.rs

// Motor de sincronização do funil: mutações otimistas locais, sincronização
// fire-and-forget com o backend e conciliação por versão.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod session;

pub use common::error::AppError;
pub use config::EngineConfig;
pub use session::CrmSession;
