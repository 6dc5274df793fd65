pub mod chat_view;
pub mod dialogs;
pub mod input_area;
pub mod message_widget;
pub mod sidebar;
pub mod window;
