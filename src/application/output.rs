//! Output Sink - 播放与保存已合成的请求

use futures_util::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::error::{collect_batch, ApplicationError};
use crate::application::ports::{AudioOutputPort, AudioStoragePort, PlaybackError};
use crate::domain::{SynthesizedAudio, VoiceRequest};

/// 输出端
pub struct OutputSink {
    storage: Arc<dyn AudioStoragePort>,
    output: Option<Arc<dyn AudioOutputPort>>,
}

impl OutputSink {
    pub fn new(storage: Arc<dyn AudioStoragePort>, output: Option<Arc<dyn AudioOutputPort>>) -> Self {
        Self { storage, output }
    }

    /// 按顺序逐个播放，每个请求播放结束后才开始下一个
    ///
    /// 任一请求未合成时，在播放该请求前返回 `NotBuilt`
    pub fn play(&self, requests: &[VoiceRequest]) -> Result<(), ApplicationError> {
        let output = self.output.as_ref().ok_or_else(|| {
            ApplicationError::Playback(PlaybackError::Device(
                "No audio output configured".to_string(),
            ))
        })?;

        for request in requests {
            let audio = built_audio(request)?;
            tracing::debug!(
                text = %request.text(),
                speaker_id = %request.speaker_id(),
                sample_rate = audio.sample_rate(),
                "Playing request"
            );
            output.play(audio)?;
        }

        Ok(())
    }

    /// 保存到 `directory/<text>_<speakerId>.wav`
    ///
    /// 不同文件并发写入；落到同一文件的请求按输入顺序依次写入，最后一个生效。
    /// 单个失败不影响其他请求的写入
    pub async fn save(
        &self,
        requests: &[VoiceRequest],
        directory: &Path,
    ) -> Result<Vec<PathBuf>, ApplicationError> {
        self.storage.ensure_dir(directory).await?;

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of: HashMap<PathBuf, usize> = HashMap::new();
        for (index, request) in requests.iter().enumerate() {
            let path = self.storage.get_audio_path(directory, &request.file_stem());
            let group = *group_of.entry(path).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(index);
        }

        let written = join_all(groups.iter().map(|indices| async move {
            let mut results = Vec::with_capacity(indices.len());
            for &index in indices {
                results.push((index, self.save_one(&requests[index], directory).await));
            }
            results
        }))
        .await;

        let mut results: Vec<_> = written.into_iter().flatten().collect();
        results.sort_by_key(|(index, _)| *index);

        let paths = collect_batch(results.into_iter().map(|(_, result)| result).collect())?;
        tracing::info!(
            count = paths.len(),
            dir = %directory.display(),
            "Audio saved"
        );
        Ok(paths)
    }

    async fn save_one(
        &self,
        request: &VoiceRequest,
        directory: &Path,
    ) -> Result<PathBuf, ApplicationError> {
        let audio = built_audio(request)?;
        let path = self
            .storage
            .save_audio(directory, &request.file_stem(), audio.data())
            .await?;
        Ok(path)
    }
}

fn built_audio(request: &VoiceRequest) -> Result<&SynthesizedAudio, ApplicationError> {
    request
        .audio()
        .ok_or_else(|| ApplicationError::not_built(request.text(), request.speaker_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Overrides, SpeakerId};
    use crate::infrastructure::adapters::{decode_pcm, encode_wav_pcm16, FileAudioStorage};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// 记录播放内容的输出
    #[derive(Default)]
    struct RecordingOutput {
        played: Mutex<Vec<(Vec<i16>, u32)>>,
    }

    impl AudioOutputPort for RecordingOutput {
        fn play(&self, audio: &SynthesizedAudio) -> Result<(), PlaybackError> {
            let pcm = decode_pcm(audio.data(), audio.sample_rate())?;
            self.played
                .lock()
                .unwrap()
                .push((pcm.samples, pcm.sample_rate));
            Ok(())
        }
    }

    fn built(text: &str, samples: &[i16]) -> VoiceRequest {
        let mut request =
            VoiceRequest::new(text, SpeakerId::new(2), Overrides::new(), 20).unwrap();
        request.attach_audio(SynthesizedAudio::new(
            encode_wav_pcm16(samples, 1, 24000),
            24000,
        ));
        request
    }

    fn sink(output: Arc<RecordingOutput>) -> OutputSink {
        OutputSink::new(Arc::new(FileAudioStorage::new()), Some(output))
    }

    #[test]
    fn test_play_in_order() {
        let output = Arc::new(RecordingOutput::default());
        let sink = sink(output.clone());

        sink.play(&[built("a", &[1, 2]), built("b", &[3])]).unwrap();

        let played = output.played.lock().unwrap();
        assert_eq!(*played, vec![(vec![1, 2], 24000), (vec![3], 24000)]);
    }

    #[test]
    fn test_play_unbuilt_fails() {
        let output = Arc::new(RecordingOutput::default());
        let sink = sink(output.clone());
        let unbuilt = VoiceRequest::new("まだ", SpeakerId::new(2), Overrides::new(), 20).unwrap();

        let err = sink.play(&[built("a", &[1]), unbuilt]).unwrap_err();
        assert!(matches!(err, ApplicationError::NotBuilt { ref text, .. } if text == "まだ"));
        // 前面已合成的请求照常播放
        assert_eq!(output.played.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_play_without_output_device() {
        let sink = OutputSink::new(Arc::new(FileAudioStorage::new()), None);
        assert!(matches!(
            sink.play(&[built("a", &[1])]),
            Err(ApplicationError::Playback(PlaybackError::Device(_)))
        ));
    }

    #[tokio::test]
    async fn test_save_twice_overwrites() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("sounds").join("voicevox");
        let sink = sink(Arc::new(RecordingOutput::default()));
        let request = built("ありがとう", &[5, 6, 7]);

        let first = sink.save(std::slice::from_ref(&request), &dir).await.unwrap();
        let second = sink.save(std::slice::from_ref(&request), &dir).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], dir.join("ありがとう_2.wav"));
        assert_eq!(
            std::fs::read(&second[0]).unwrap(),
            request.audio().unwrap().data()
        );
    }

    #[tokio::test]
    async fn test_save_same_file_name_last_request_wins() {
        let temp_dir = tempdir().unwrap();
        let sink = sink(Arc::new(RecordingOutput::default()));

        let mut slow = VoiceRequest::new(
            "同じ",
            SpeakerId::new(2),
            Overrides::new().with("speed", 1.0),
            20,
        )
        .unwrap();
        slow.attach_audio(SynthesizedAudio::new(vec![0xAAu8; 8 * 1024 * 1024], 24000));
        let mut fast = VoiceRequest::new(
            "同じ",
            SpeakerId::new(2),
            Overrides::new().with("speed", 2.0),
            20,
        )
        .unwrap();
        fast.attach_audio(SynthesizedAudio::new(vec![0xBBu8; 1024 * 1024], 24000));
        // 不带覆盖参数，文件名同样是 同じ_2
        let other = built("同じ", &[3]);

        let requests = [slow, fast, other.clone()];
        for _ in 0..5 {
            let paths = sink.save(&requests, temp_dir.path()).await.unwrap();
            assert_eq!(paths[0], paths[1]);
            assert_eq!(paths[1], paths[2]);
            assert_eq!(
                std::fs::read(&paths[0]).unwrap(),
                other.audio().unwrap().data()
            );
        }

        let paths = sink.save(&requests[..2], temp_dir.path()).await.unwrap();
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![0xBBu8; 1024 * 1024]);
    }

    #[tokio::test]
    async fn test_save_sanitized_collision_keeps_input_order() {
        let temp_dir = tempdir().unwrap();
        let sink = sink(Arc::new(RecordingOutput::default()));

        let requests = [built("a/b", &[1, 1]), built("a_b", &[2])];
        let paths = sink.save(&requests, temp_dir.path()).await.unwrap();

        assert_eq!(paths[0], temp_dir.path().join("a_b_2.wav"));
        assert_eq!(paths[0], paths[1]);
        assert_eq!(
            std::fs::read(&paths[0]).unwrap(),
            requests[1].audio().unwrap().data()
        );
    }

    #[tokio::test]
    async fn test_save_unbuilt_does_not_abort_siblings() {
        let temp_dir = tempdir().unwrap();
        let sink = sink(Arc::new(RecordingOutput::default()));
        let unbuilt = VoiceRequest::new("まだ", SpeakerId::new(2), Overrides::new(), 20).unwrap();

        let err = sink
            .save(&[unbuilt, built("できた", &[1])], temp_dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].index, 0);
        assert!(temp_dir.path().join("できた_2.wav").exists());
    }
}
