pub mod calendar_store;
pub use calendar_store::CalendarStore;
pub mod lead_store;
pub use lead_store::LeadStore;
pub mod gateway;
pub use gateway::PersistenceGateway;
pub mod memory_gateway;
pub use memory_gateway::MemoryGateway;
