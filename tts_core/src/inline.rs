use base64::{engine::general_purpose, Engine as _};

pub const MP3_MIME: &str = "audio/mpeg";

/// Encode MP3 bytes as Base64 for inline playback.
pub fn encode_audio_base64(audio: &[u8]) -> String {
    general_purpose::STANDARD.encode(audio)
}

/// Self-contained `data:` URL that any audio element can play without the
/// stored file.
pub fn audio_data_url(audio: &[u8]) -> String {
    format!("data:{};base64,{}", MP3_MIME, encode_audio_base64(audio))
}
