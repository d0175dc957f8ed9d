//! Mock traffic: one change-brightness request per source file, forever.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::{
    error::{AmqpError, Result},
    message::{new_request_id, ChangeBrightnessParameters, BRIGHTNESS_FACTOR_RANGE, CHANGE_BRIGHTNESS_PROCEDURE},
    publisher::publish_request,
    topology::CHANGE_BRIGHTNESS_ROUTING_KEY,
    traits::AmqpPublisher,
};

/// Pause after each publish, in seconds, drawn from this half-open range.
pub const PUBLISH_DELAY_SECS: Range<f64> = 2.0..5.0;

pub struct MockRequestGenerator<P> {
    publisher: P,
    src_folder: PathBuf,
    out_folder: PathBuf,
    rng: StdRng,
}

impl<P: AmqpPublisher> MockRequestGenerator<P> {
    pub fn new(publisher: P, src_folder: impl Into<PathBuf>, out_folder: impl Into<PathBuf>) -> Self {
        Self {
            publisher,
            src_folder: src_folder.into(),
            out_folder: out_folder.into(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[cfg(test)]
    pub(crate) fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run passes until one fails. Never returns `Ok`.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let published = self.run_pass().await?;
            if published == 0 {
                // Nothing to sleep on; let the runtime observe signals before re-listing.
                tokio::task::yield_now().await;
            }
        }
    }

    /// List the source folder once and publish a request per file.
    ///
    /// Returns the number of requests published.
    pub async fn run_pass(&mut self) -> Result<usize> {
        let file_names = list_source_files(&self.src_folder)?;
        tracing::debug!("{} file(s) in {}", file_names.len(), self.src_folder.display());

        for file_name in &file_names {
            let request_id = new_request_id();
            let parameters = self.change_brightness_parameters(file_name);

            publish_request(
                &self.publisher,
                CHANGE_BRIGHTNESS_ROUTING_KEY,
                &request_id,
                CHANGE_BRIGHTNESS_PROCEDURE,
                parameters,
            )
            .await?;

            tokio::time::sleep(self.next_delay()).await;
        }

        Ok(file_names.len())
    }

    pub fn change_brightness_parameters(&mut self, file_name: &str) -> ChangeBrightnessParameters {
        ChangeBrightnessParameters {
            input_image_uri: self.src_folder.join(file_name).to_string_lossy().into_owned(),
            output_image_uri: self.out_folder.join(file_name).to_string_lossy().into_owned(),
            brightness_factor: self.rng.gen_range(BRIGHTNESS_FACTOR_RANGE),
        }
    }

    fn next_delay(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.gen_range(PUBLISH_DELAY_SECS))
    }
}

/// Names of the regular files in `folder`.
///
/// Names are sorted lexicographically rather than returned in the order the
/// OS lists them. Names that are not valid UTF-8 are skipped with a warning,
/// since they cannot be carried in a JSON request.
pub fn list_source_files(folder: &Path) -> Result<Vec<String>> {
    let folder_error = |source| AmqpError::SourceFolderError {
        path: folder.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(folder_error)? {
        let entry = entry.map_err(folder_error)?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => tracing::warn!("Skipping non UTF-8 file name {:?} in {}", name, folder.display()),
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Value)>>,
        fail_after: Option<usize>,
    }

    impl RecordingPublisher {
        fn failing_after(count: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_after: Some(count),
            }
        }

        fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AmqpPublisher for RecordingPublisher {
        async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after == Some(sent.len()) {
                return Err(AmqpError::ChannelError("channel closed".to_string()));
            }
            sent.push((routing_key.to_string(), serde_json::from_slice(payload).unwrap()));
            Ok(())
        }
    }

    fn source_folder(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"png").unwrap();
        }
        dir
    }

    fn generator(src: &Path, publisher: RecordingPublisher) -> MockRequestGenerator<RecordingPublisher> {
        MockRequestGenerator::new(publisher, src, "/images/out").with_rng(StdRng::seed_from_u64(7))
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_request_per_file_in_listing_order() {
        let src = source_folder(&["b.png", "a.png"]);
        let mut generator = generator(src.path(), RecordingPublisher::default());

        let published = generator.run_pass().await.unwrap();
        assert_eq!(published, 2);

        let sent = generator.publisher().sent();
        assert_eq!(sent.len(), 2);

        for ((routing_key, body), name) in sent.iter().zip(["a.png", "b.png"]) {
            assert_eq!(routing_key, "requests.change-brightness");
            assert_eq!(body["procedure"], "change_brightness");
            assert_eq!(
                body["parameters"]["inputImageURI"],
                src.path().join(name).to_string_lossy().into_owned()
            );
            assert_eq!(body["parameters"]["outputImageURI"], format!("/images/out/{}", name));
        }

        assert_ne!(sent[0].1["messageId"], sent[1].1["messageId"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subdirectories_are_skipped() {
        let src = source_folder(&["a.png"]);
        fs::create_dir(src.path().join("nested")).unwrap();
        let mut generator = generator(src.path(), RecordingPublisher::default());

        assert_eq!(generator.run_pass().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_two_and_five_seconds_per_file() {
        let src = source_folder(&["a.png", "b.png", "c.png"]);
        let mut generator = generator(src.path(), RecordingPublisher::default());

        let started = Instant::now();
        generator.run_pass().await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(6), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(15), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_folder_publishes_nothing_without_delay() {
        let src = source_folder(&[]);
        let mut generator = generator(src.path(), RecordingPublisher::default());

        let started = Instant::now();
        assert_eq!(generator.run_pass().await.unwrap(), 0);

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(generator.publisher().sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut generator = generator(&missing, RecordingPublisher::default());

        let result = generator.run_pass().await;
        assert!(matches!(result, Err(AmqpError::SourceFolderError { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_aborts_run() {
        let src = source_folder(&["a.png", "b.png", "c.png"]);
        let mut generator = generator(src.path(), RecordingPublisher::failing_after(1));

        let result = generator.run().await;

        assert!(matches!(result, Err(AmqpError::ChannelError(_))));
        assert_eq!(generator.publisher().sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_repeats_passes() {
        let src = source_folder(&["a.png", "b.png"]);
        let mut generator = generator(src.path(), RecordingPublisher::failing_after(5));

        let result = generator.run().await;

        assert!(result.is_err());
        let inputs: Vec<String> = generator
            .publisher()
            .sent()
            .iter()
            .map(|(_, body)| body["parameters"]["inputImageURI"].as_str().unwrap().to_string())
            .collect();
        let a = src.path().join("a.png").to_string_lossy().into_owned();
        let b = src.path().join("b.png").to_string_lossy().into_owned();
        assert_eq!(inputs, vec![a.clone(), b.clone(), a.clone(), b, a]);
    }

    #[test]
    fn test_brightness_factor_stays_in_range() {
        let src = source_folder(&[]);
        let mut generator = generator(src.path(), RecordingPublisher::default());
        for _ in 0..10_000 {
            let factor = generator.change_brightness_parameters("a.png").brightness_factor;
            assert!((0.5..2.0).contains(&factor), "factor {} out of range", factor);
        }
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let src = source_folder(&["b.png"]);
        fs::write(src.path().join(OsStr::from_bytes(b"a\xff.png")), b"png").unwrap();

        assert_eq!(list_source_files(src.path()).unwrap(), vec!["b.png".to_string()]);

        let mut generator = generator(src.path(), RecordingPublisher::default());
        assert_eq!(generator.run_pass().await.unwrap(), 1);
        assert_eq!(
            generator.publisher().sent()[0].1["parameters"]["inputImageURI"],
            src.path().join("b.png").to_string_lossy().into_owned()
        );
    }
}
