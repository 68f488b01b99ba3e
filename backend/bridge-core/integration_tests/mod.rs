mod channel;
mod dispatcher;
mod helpers;
mod parity;
mod selector;
