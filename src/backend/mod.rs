//! 后端网关：表格脚本服务（预约写入、查询、取消）

pub mod apps_script;
pub mod mock;
pub mod traits;
pub mod types;

pub use apps_script::{AppsScriptGateway, DEFAULT_TIMEOUT_SECS};
pub use mock::MockBackend;
pub use traits::BackendGateway;
pub use types::{Appointment, BackendRequest, BackendResult};
