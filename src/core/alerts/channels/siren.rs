use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::ChannelAdapter;
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::ChannelError;

/// Plays a local alarm sound on the default output device.
pub struct SirenChannel {
    sound_path: PathBuf,
}

impl SirenChannel {
    pub fn new(sound_path: PathBuf) -> Self {
        Self { sound_path }
    }
}

#[cfg(feature = "siren")]
fn play(path: &Path) -> Result<(), ChannelError> {
    let file = std::fs::File::open(path)?;
    let stream = rodio::OutputStreamBuilder::open_default_stream()
        .map_err(|e| ChannelError::Playback(e.to_string()))?;
    let sink = rodio::play(stream.mixer(), std::io::BufReader::new(file))
        .map_err(|e| ChannelError::Playback(e.to_string()))?;
    sink.sleep_until_end();
    Ok(())
}

#[cfg(not(feature = "siren"))]
fn play(path: &Path) -> Result<(), ChannelError> {
    Err(ChannelError::Playback(format!(
        "cannot play {}: built without the `siren` feature",
        path.display()
    )))
}

#[async_trait]
impl ChannelAdapter for SirenChannel {
    fn name(&self) -> &str {
        "siren"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Siren
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let path = self.sound_path.clone();
        log::debug!("Sounding siren for {}", envelope.condition);
        // Audio output blocks until the clip ends
        tokio::task::spawn_blocking(move || play(&path))
            .await
            .map_err(|e| ChannelError::Playback(e.to_string()))?
    }
}
