pub mod beam;
pub mod buttons;
pub mod codec;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod history;
pub mod hooks;
pub mod inventory;
pub mod level;
pub mod push;
pub mod registry;
pub mod timer;
pub mod tunnel;
