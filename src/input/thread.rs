use crossterm::event;
use std::sync::mpsc::{self, Receiver};

use tracing::warn;

#[derive(Debug)]
pub enum InputMessage {
    Event(crossterm::event::Event),
    ReadError(String),
}

pub type InputReceiver = Receiver<InputMessage>;

pub fn spawn_input_thread() -> std::io::Result<InputReceiver> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("depthshade-input".into())
        .spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(InputMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "terminal event read failed");
                    let _ = tx.send(InputMessage::ReadError(err.to_string()));
                    break;
                }
            }
        })?;
    Ok(rx)
}
