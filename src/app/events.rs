/// Everything the main loop reacts to, funnelled through one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Input(String),
    InputClosed,
    Interrupt,
}
