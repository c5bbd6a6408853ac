//! Blocking client for the Whombat REST API.

use std::io::Read;
use std::time::Duration;

use crate::audio::{decode_wav, AudioSegment};
use crate::canvas::ChunkImage;
use crate::chunk_manager::SpectrogramRequest;
use crate::config::ServerConfig;
use crate::error::{AudioFetchError, ChunkFetchError, MutationError, SearchError};
use crate::geometry::Geometry;
use crate::models::{Recording, Tag};
use crate::player::AudioRequest;
use crate::services::fetch::{AudioSource, SpectrogramSource, SpeciesSource};
use crate::services::mutations::AnnotationSink;
use crate::settings::AudioSettings;
use crate::species::SpeciesCandidate;

/// Upper bound on a single response body.
const MAX_BODY_BYTES: u64 = 512 * 1024 * 1024;

type Params = Vec<(&'static str, String)>;

/// Failure reported by [`HttpClient::get_bytes`] before it is mapped to the
/// caller's error type.
#[derive(Debug)]
enum RequestFailure {
    Status(u16),
    Transport(String),
}

pub struct HttpClient {
    agent: ureq::Agent,
    server: ServerConfig,
}

impl HttpClient {
    pub fn new(server: ServerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(server.request_timeout_secs))
            .build();
        Self { agent, server }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Fetch recording metadata.
    pub fn fetch_recording(&self, uuid: &str) -> anyhow::Result<Recording> {
        use anyhow::Context;

        let bytes = self
            .get_bytes("/recordings/detail/", &[("recording_uuid", uuid.to_string())])
            .map_err(|e| anyhow::anyhow!("{:?}", e))
            .with_context(|| format!("Failed to fetch recording {}", uuid))?;
        serde_json::from_slice(&bytes).context("Invalid recording response")
    }

    fn get_bytes(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<u8>, RequestFailure> {
        let url = self.server.endpoint(path);
        let mut request = self.agent.get(&url);
        for (key, value) in params {
            request = request.query(key, value);
        }
        let response = request.call().map_err(request_failure)?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        Ok(bytes)
    }

    fn send(
        &self,
        method: &str,
        path: &str,
        params: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<(), MutationError> {
        let url = self.server.endpoint(path);
        let mut request = self.agent.request(method, &url);
        for (key, value) in params {
            request = request.query(key, value);
        }
        let result = match body {
            Some(body) => {
                let payload = serde_json::to_string(&body).map_err(|e| MutationError::Encode {
                    reason: e.to_string(),
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
            None => request.call(),
        };
        match result.map_err(request_failure) {
            Ok(_) => Ok(()),
            Err(RequestFailure::Status(status)) => Err(MutationError::Status { status }),
            Err(RequestFailure::Transport(reason)) => Err(MutationError::Network { reason }),
        }
    }
}

fn request_failure(err: ureq::Error) -> RequestFailure {
    match err {
        ureq::Error::Status(status, _) => RequestFailure::Status(status),
        ureq::Error::Transport(t) => RequestFailure::Transport(t.to_string()),
    }
}

fn audio_params(audio: &AudioSettings) -> Params {
    let mut params: Params = vec![
        ("resample", audio.resample.to_string()),
        ("samplerate", audio.samplerate.to_string()),
        ("filter_order", audio.filter_order.to_string()),
        ("channel", audio.channel.to_string()),
        ("speed", audio.speed.to_string()),
    ];
    if let Some(low) = audio.low_freq {
        params.push(("low_freq", low.to_string()));
    }
    if let Some(high) = audio.high_freq {
        params.push(("high_freq", high.to_string()));
    }
    params
}

fn spectrogram_params(request: &SpectrogramRequest) -> Params {
    let s = &request.spectrogram;
    let mut params: Params = vec![
        ("recording_uuid", request.recording_uuid.clone()),
        ("start_time", request.interval.min.to_string()),
        ("end_time", request.interval.max.to_string()),
        ("window_size", s.window_size.to_string()),
        ("overlap", s.overlap.to_string()),
        ("window", s.window.as_str().to_string()),
        ("scale", s.scale.as_str().to_string()),
        ("cmap", s.cmap.as_str().to_string()),
        ("min_dB", s.min_db.to_string()),
        ("max_dB", s.max_db.to_string()),
        ("normalize", s.normalize.to_string()),
        ("pcen", s.pcen.to_string()),
        ("clamp", s.clamp.to_string()),
    ];
    params.extend(audio_params(&request.audio));
    params
}

/// Decode an encoded chunk image (PNG or JPEG) into RGBA.
pub fn decode_chunk_image(bytes: &[u8]) -> Result<ChunkImage, ChunkFetchError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ChunkFetchError::Decode {
            reason: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(ChunkImage::new(width, height, image.into_raw()))
}

impl SpectrogramSource for HttpClient {
    fn fetch_chunk(&self, request: &SpectrogramRequest) -> Result<ChunkImage, ChunkFetchError> {
        let bytes = self
            .get_bytes("/spectrograms/", &spectrogram_params(request))
            .map_err(|e| match e {
                RequestFailure::Status(status) => ChunkFetchError::Status { status },
                RequestFailure::Transport(reason) => ChunkFetchError::Network { reason },
            })?;
        decode_chunk_image(&bytes)
    }
}

impl AudioSource for HttpClient {
    fn fetch_segment(&self, request: &AudioRequest) -> Result<AudioSegment, AudioFetchError> {
        let mut params: Params = vec![
            ("recording_uuid", request.recording_uuid.clone()),
            ("start_time", request.interval.min.to_string()),
            ("end_time", request.interval.max.to_string()),
        ];
        params.extend(audio_params(&request.audio));
        let bytes = self
            .get_bytes("/audio/download/", &params)
            .map_err(|e| match e {
                RequestFailure::Status(status) => AudioFetchError::Status { status },
                RequestFailure::Transport(reason) => AudioFetchError::Network { reason },
            })?;
        decode_wav(&bytes, request.interval)
    }
}

impl SpeciesSource for HttpClient {
    fn search_species(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SpeciesCandidate>, SearchError> {
        let bytes = self
            .get_bytes(
                "/species/search/",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .map_err(|e| match e {
                RequestFailure::Status(status) => SearchError::Status { status },
                RequestFailure::Transport(reason) => SearchError::Network { reason },
            })?;
        serde_json::from_slice(&bytes).map_err(|e| SearchError::Decode {
            reason: e.to_string(),
        })
    }
}

impl AnnotationSink for HttpClient {
    fn persist_geometry(&self, sound_event: &str, geometry: &Geometry) -> Result<(), MutationError> {
        let body = serde_json::json!({ "geometry": geometry });
        self.send(
            "PATCH",
            "/sound_event_annotations/detail/",
            &[("sound_event_annotation_uuid", sound_event.to_string())],
            Some(body),
        )
    }

    fn persist_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError> {
        self.send(
            "POST",
            "/sound_event_annotations/detail/tags/",
            &[
                ("sound_event_annotation_uuid", entity.to_string()),
                ("key", tag.key.clone()),
                ("value", tag.value.clone()),
            ],
            None,
        )
    }

    fn remove_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError> {
        self.send(
            "DELETE",
            "/sound_event_annotations/detail/tags/",
            &[
                ("sound_event_annotation_uuid", entity.to_string()),
                ("key", tag.key.clone()),
                ("value", tag.value.clone()),
            ],
            None,
        )
    }

    fn create_note(&self, entity: &str, message: &str) -> Result<(), MutationError> {
        let body = serde_json::json!({ "message": message, "is_issue": false });
        self.send(
            "POST",
            "/sound_event_annotations/detail/notes/",
            &[("sound_event_annotation_uuid", entity.to_string())],
            Some(body),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::settings::SpectrogramSettings;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_decode_chunk_image_png() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let chunk = decode_chunk_image(&bytes).unwrap();
        assert_eq!((chunk.width(), chunk.height()), (3, 2));
        assert_eq!(&chunk.pixels()[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_chunk_image_garbage() {
        assert!(matches!(
            decode_chunk_image(b"nope"),
            Err(ChunkFetchError::Decode { .. })
        ));
    }

    #[test]
    fn test_spectrogram_params() {
        let request = SpectrogramRequest {
            recording_uuid: "abc".to_string(),
            interval: Interval::new(4.5, 10.25),
            audio: AudioSettings {
                low_freq: Some(1000.0),
                ..Default::default()
            },
            spectrogram: SpectrogramSettings::default(),
        };
        let params = spectrogram_params(&request);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.clone());
        assert_eq!(get("start_time").as_deref(), Some("4.5"));
        assert_eq!(get("end_time").as_deref(), Some("10.25"));
        assert_eq!(get("low_freq").as_deref(), Some("1000"));
        assert_eq!(get("high_freq"), None);
        assert_eq!(get("cmap").as_deref(), Some("viridis"));
    }

    #[test]
    fn test_unreachable_server_maps_to_network_error() {
        let client = HttpClient::new(ServerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
            ..Default::default()
        });
        let result = client.search_species("Myotis", 5);
        assert!(matches!(result, Err(SearchError::Network { .. })));
    }
}
