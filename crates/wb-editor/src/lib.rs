pub mod bus;
pub mod clipboard;
pub mod config;
pub mod events;
pub mod gesture;
pub mod history;
pub mod input;
pub mod pipeline;
pub mod shortcuts;
pub mod tools;
pub mod viewport;

pub use bus::{EventBus, Subscription};
pub use clipboard::{Clipboard, MemoryClipboard};
pub use config::EditorConfig;
pub use events::{EditorEvent, EventId, EventPhase};
pub use gesture::{MoveGesture, ResizeGesture, ResizeHandle, RotateGesture};
pub use history::HistoryStack;
pub use input::{InputEvent, Modifiers};
pub use pipeline::CanvasEngine;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{ConnectTool, InsertTool, SelectTool, Tool, ToolKind};
