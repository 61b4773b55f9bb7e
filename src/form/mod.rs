//! 任务新建/编辑表单：界面状态、事件和驱动它们的 view-model

pub mod event;
pub mod state;
pub mod view_model;

pub use event::FormEvent;
pub use state::FormUiState;
pub use view_model::{LateEmissionPolicy, TaskFormViewModel};
