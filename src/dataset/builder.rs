//! [`DatasetBuilder`]: loads records, segments them, resamples windows and
//! extracts features, with a cache in front of each stage.

use std::sync::Arc;

use crate::config::DatasetConfig;
use crate::dsp::{ResampleMethod, WindowResampler};
use crate::features::{FeatureExtractor, ThresholdCrossingExtractor};
use crate::record::{CorrectionTable, Record, RecordLoader, WfdbLoader};
use crate::segment::Segmenter;

use super::cache::{CacheKey, CacheOutcome, CachePayload, CacheStore};
use super::pool::FeaturePool;
use super::{Dataset, DatasetError, FeatureSet, RecordSummary};

const SEGMENT_STAGE: &str = "segments";
const FEATURE_STAGE: &str = "features";

/// Orchestrates a batch run.  Construct with [`new`](Self::new) and the
/// `with_*` setters, or [`from_config`](Self::from_config).
pub struct DatasetBuilder {
    loader: Arc<dyn RecordLoader>,
    corrections: CorrectionTable,
    target_rate: f64,
    resample_method: ResampleMethod,
    cache: Option<CacheStore>,
    skip_failed_records: bool,
    extractor: Arc<dyn FeatureExtractor>,
    jobs: usize,
}

impl std::fmt::Debug for DatasetBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetBuilder")
            .field("corrections", &self.corrections.len())
            .field("target_rate", &self.target_rate)
            .field("resample_method", &self.resample_method)
            .field("cache", &self.cache)
            .field("skip_failed_records", &self.skip_failed_records)
            .field("extractor", &self.extractor.cache_tag())
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl DatasetBuilder {
    /// Builder over `loader` with 360 Hz Fourier resampling, no
    /// corrections, no cache and the default extractor on 4 threads.
    pub fn new(loader: Arc<dyn RecordLoader>) -> Self {
        Self {
            loader,
            corrections: CorrectionTable::new(),
            target_rate: 360.0,
            resample_method: ResampleMethod::default(),
            cache: None,
            skip_failed_records: false,
            extractor: Arc::new(ThresholdCrossingExtractor::default()),
            jobs: 4,
        }
    }

    /// Builder reading WFDB records under the configured root.  Loads the
    /// correction file when one is configured.
    pub fn from_config(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let corrections = match &config.dataset.correction_file {
            Some(path) => CorrectionTable::load(path)?,
            None => CorrectionTable::new(),
        };
        let cache = config
            .dataset
            .use_cache
            .then(|| CacheStore::new(&config.dataset.cache_dir));
        let extractor = ThresholdCrossingExtractor::new(
            config.features.crossing_threshold,
            config.features.crossing_block_secs,
        );

        Ok(
            Self::new(Arc::new(WfdbLoader::new(&config.dataset.database_root)))
                .with_corrections(corrections)
                .with_target_rate(config.segmentation.target_rate)
                .with_resample_method(config.segmentation.resample_method)
                .with_cache(cache)
                .skip_failed_records(config.dataset.skip_failed_records)
                .with_extractor(Arc::new(extractor))
                .with_jobs(config.features.jobs),
        )
    }

    pub fn with_corrections(mut self, corrections: CorrectionTable) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn with_target_rate(mut self, target_rate: f64) -> Self {
        self.target_rate = target_rate;
        self
    }

    pub fn with_resample_method(mut self, method: ResampleMethod) -> Self {
        self.resample_method = method;
        self
    }

    pub fn with_cache(mut self, cache: Option<CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Log and skip records that fail to load or are out of order, instead
    /// of aborting the run.
    pub fn skip_failed_records(mut self, skip: bool) -> Self {
        self.skip_failed_records = skip;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Key of the segment stage for `databases` and `window_secs`.
    pub fn cache_key(&self, databases: &[String], window_secs: f64) -> CacheKey {
        CacheKey::new(
            databases,
            window_secs,
            self.target_rate,
            self.resample_method,
            self.corrections.fingerprint(),
        )
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Load every record of every database, in database then name order.
    pub fn load_recordings(&self, databases: &[String]) -> Result<Vec<Record>, DatasetError> {
        let mut records = Vec::new();
        for database in databases {
            let names = match self.loader.list_records(database) {
                Ok(names) => names,
                Err(source) => {
                    self.recover(database, DatasetError::Load {
                        record: database.clone(),
                        source,
                    })?;
                    continue;
                }
            };

            for name in names {
                match self.loader.load(database, &name) {
                    Ok(record) => {
                        log::info!(
                            "dataset: read {}: {} Hz, {} samples, {} annotations",
                            record.id(),
                            record.signal.sampling_rate,
                            record.signal.len(),
                            record.annotations.len()
                        );
                        records.push(record);
                    }
                    Err(source) => {
                        let id = format!("{database}/{name}");
                        self.recover(&id, DatasetError::Load {
                            record: id.clone(),
                            source,
                        })?;
                    }
                }
            }
        }
        Ok(records)
    }

    /// Apply corrections, segment each record into `window_secs` windows and
    /// resample every window to the target rate.
    pub fn build_dataset(
        &self,
        records: &[Record],
        window_secs: f64,
    ) -> Result<Dataset, DatasetError> {
        let mut resampler = WindowResampler::new(self.resample_method);
        let mut summaries = Vec::with_capacity(records.len());
        let mut windows = Vec::new();

        for record in records {
            let id = record.id();
            let annotations = self.corrections.apply(&id, record.annotations.clone());
            let rate = record.signal.sampling_rate;

            // Streams are ordered by construction; unsorted annotations were
            // already reported by `load_recordings`.
            let segmented = Segmenter::new(window_secs, rate)
                .and_then(|s| s.segment(&id, &record.signal.samples, annotations.as_slice()))
                .map_err(|source| DatasetError::Segment {
                    record: id.clone(),
                    source,
                })?;

            let n_positive = segmented.iter().filter(|w| w.label()).count();
            log::info!(
                "dataset: {id}: {} windows, {n_positive} positive",
                segmented.len()
            );
            summaries.push(RecordSummary {
                database: record.database.clone(),
                record: record.name.clone(),
                sampling_rate: rate,
                n_samples: record.signal.len(),
                n_annotations: annotations.len(),
                n_windows: segmented.len(),
                n_positive,
            });

            for window in segmented {
                if window.sampling_rate == self.target_rate {
                    windows.push(window);
                    continue;
                }
                let samples =
                    resampler.resample(&window.samples, window.sampling_rate, self.target_rate)?;
                windows.push(window.with_samples(samples, self.target_rate));
            }
        }

        Ok(Dataset {
            window_secs,
            target_rate: self.target_rate,
            records: summaries,
            windows,
        })
    }

    /// The segment stage, served from the cache when possible.
    pub fn load_segments(
        &self,
        databases: &[String],
        window_secs: f64,
    ) -> Result<Dataset, DatasetError> {
        let key = self.cache_key(databases, window_secs);
        if let Some(dataset) = self.cached::<Dataset>(SEGMENT_STAGE, &key) {
            return Ok(dataset);
        }

        let records = self.load_recordings(databases)?;
        let dataset = self.build_dataset(&records, window_secs)?;
        log::info!(
            "dataset: {} windows from {} records, {} positive",
            dataset.len(),
            dataset.records.len(),
            dataset.n_positive()
        );
        self.store(SEGMENT_STAGE, &key, &dataset);
        Ok(dataset)
    }

    /// Feature rows and labels for every window.
    pub fn extract_features(&self, dataset: &Dataset) -> Result<FeatureSet, DatasetError> {
        let pool = FeaturePool::new(self.jobs, Arc::clone(&self.extractor))?;
        let features = pool.run(&dataset.windows)?;
        Ok(FeatureSet {
            extractor: self.extractor.cache_tag(),
            features,
            labels: dataset.labels(),
        })
    }

    /// The feature stage: the feature cache first, then the segment stage
    /// plus extraction.
    pub fn load_features(
        &self,
        databases: &[String],
        window_secs: f64,
    ) -> Result<FeatureSet, DatasetError> {
        let key = self.feature_key(databases, window_secs);
        if let Some(features) = self.cached::<FeatureSet>(FEATURE_STAGE, &key) {
            return Ok(features);
        }

        let dataset = self.load_segments(databases, window_secs)?;
        self.extract_and_store(&dataset, &key)
    }

    /// The feature stage for a dataset already in hand, which must have
    /// been built from `databases`.
    pub fn load_features_from(
        &self,
        dataset: &Dataset,
        databases: &[String],
    ) -> Result<FeatureSet, DatasetError> {
        let key = self.feature_key(databases, dataset.window_secs);
        match self.cached::<FeatureSet>(FEATURE_STAGE, &key) {
            Some(features) if features.labels == dataset.labels() => Ok(features),
            _ => self.extract_and_store(dataset, &key),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn feature_key(&self, databases: &[String], window_secs: f64) -> CacheKey {
        self.cache_key(databases, window_secs)
            .with_extractor(self.extractor.cache_tag())
    }

    fn extract_and_store(
        &self,
        dataset: &Dataset,
        key: &CacheKey,
    ) -> Result<FeatureSet, DatasetError> {
        let features = self.extract_features(dataset)?;
        log::info!("features: extracted {:?}", features.shape());
        self.store(FEATURE_STAGE, key, &features);
        Ok(features)
    }

    /// Log `err` and carry on when skipping is enabled, otherwise fail.
    fn recover(&self, what: &str, err: DatasetError) -> Result<(), DatasetError> {
        if self.skip_failed_records {
            log::warn!("dataset: skipping {what}: {err}");
            Ok(())
        } else {
            log::error!("dataset: {err}");
            Err(err)
        }
    }

    fn cached<T>(&self, stage: &str, key: &CacheKey) -> Option<T>
    where
        T: serde::de::DeserializeOwned + CachePayload,
    {
        let cache = self.cache.as_ref()?;
        match cache.load(stage, key) {
            CacheOutcome::Hit(payload) => Some(payload),
            CacheOutcome::Miss | CacheOutcome::Corrupt(_) => None,
        }
    }

    /// A failed write only costs a recomputation next run.
    fn store<T>(&self, stage: &str, key: &CacheKey, payload: &T)
    where
        T: serde::Serialize + CachePayload,
    {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(stage, key, payload) {
                log::warn!("cache: cannot write {stage}: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
