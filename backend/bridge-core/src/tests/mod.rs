mod codec;
mod commands;
mod trigger;
