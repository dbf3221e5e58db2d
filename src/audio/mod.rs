mod generated;
mod player;

pub use generated::{AudioInfo, GeneratedAudio};
pub use player::AudioPlayer;
