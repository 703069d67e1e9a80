//! 预约对话状态机
//!
//! 纯函数实现：输入当前记录与一个信号，输出记录变更与要执行的动作。
//! 步骤用封闭枚举表示，转移表即 transition 中的穷举 match。

pub mod action;
pub mod signal;
pub mod state;
pub mod texts;
mod transition;

pub use action::{Action, Completion, OutboundMessage, RecordChange, Transition};
pub use signal::{Keywords, Signal};
pub use state::{step_label, SessionRecord, Step};
pub use transition::{transition, DialogueContext};
