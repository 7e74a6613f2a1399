mod hotkey;
mod menu;
