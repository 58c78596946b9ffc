pub mod conversion_service;
pub mod ledger_service;
pub mod notification_service;
pub mod pipeline_service;
pub mod reschedule_service;
pub mod stage_service;
pub mod sync_service;
