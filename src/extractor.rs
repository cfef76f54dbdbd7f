//! Extraction entry point: decode, cluster, encode.

use crate::cluster::{ColorCluster, MAX_COLORS, cluster_pixels};
use crate::config::ExtractorConfig;
use crate::decode::decode_pixels;
use crate::encode::encode_all;
use crate::error::{ExtractError, ImageProcessingError, Result};
use crate::events::{EventSink, ExtractionEvent, TracingSink};
use std::fmt;
use std::sync::Arc;

/// Colors requested per uploaded image.
pub const BATCH_NUM_COLORS: usize = 5;

/// Colors requested per streamed frame.
pub const STREAM_NUM_COLORS: usize = 3;

/// Stateless color extractor. Cheap to share behind an `Arc`; concurrent
/// calls share nothing but the configuration and the event sink.
#[derive(Clone)]
pub struct ColorExtractor {
    config: ExtractorConfig,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for ColorExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ColorExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default(), Arc::new(TracingSink))
    }
}

impl ColorExtractor {
    pub fn new(config: ExtractorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Extract `num_colors` hex colors from an encoded image.
    ///
    /// The result is in clustering order, not sorted by prevalence, and is
    /// identical for identical inputs.
    pub fn extract(&self, bytes: &[u8], num_colors: usize) -> Result<Vec<String>> {
        let clusters = self.extract_clusters(bytes, num_colors)?;
        let colors = encode_all(&clusters);
        self.sink.record(&ExtractionEvent::Extracted {
            colors: colors.clone(),
        });
        Ok(colors)
    }

    /// Like [`extract`](Self::extract), but returns centroids with their
    /// pixel populations.
    pub fn extract_clusters(&self, bytes: &[u8], num_colors: usize) -> Result<Vec<ColorCluster>> {
        self.run(bytes, num_colors).inspect_err(|err| {
            self.sink.record(&ExtractionEvent::Rejected {
                reason: err.to_string(),
            });
        })
    }

    fn run(&self, bytes: &[u8], num_colors: usize) -> Result<Vec<ColorCluster>> {
        if num_colors == 0 || num_colors > MAX_COLORS {
            return Err(ImageProcessingError::InvalidColorCount {
                requested: num_colors,
                max: MAX_COLORS,
            }
            .into());
        }

        let decoded = decode_pixels(bytes, &self.config)?;
        let (width, height) = decoded.original_size;
        self.sink.record(&ExtractionEvent::Decoded {
            format: format!("{:?}", decoded.format),
            width,
            height,
        });

        let scaled = (decoded.matrix.width, decoded.matrix.height);
        if scaled != decoded.original_size {
            self.sink.record(&ExtractionEvent::Downscaled {
                from: decoded.original_size,
                to: scaled,
            });
        }

        let clustering = cluster_pixels(&decoded.matrix, num_colors, &self.config.cluster)?;
        self.sink.record(&ExtractionEvent::Clustered {
            requested: num_colors,
            effective: clustering.effective_k,
            distinct_colors: clustering.distinct_colors,
            score: clustering.score,
        });

        if clustering.clusters.len() != num_colors {
            return Err(ExtractError::Internal(format!(
                "expected {num_colors} clusters, got {}",
                clustering.clusters.len()
            )));
        }
        Ok(clustering.clusters)
    }
}

/// Extract dominant colors with the default configuration.
pub fn extract_dominant_colors(bytes: &[u8], num_colors: usize) -> Result<Vec<String>> {
    ColorExtractor::default().extract(bytes, num_colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn extractor_with_memory() -> (ColorExtractor, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let extractor = ColorExtractor::new(ExtractorConfig::default(), sink.clone());
        (extractor, sink)
    }

    #[test]
    fn test_zero_colors_rejected() {
        let bytes = png(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let err = extract_dominant_colors(&bytes, 0).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ImageProcessing(ImageProcessingError::InvalidColorCount {
                requested: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_too_many_colors_rejected() {
        let bytes = png(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let err = extract_dominant_colors(&bytes, MAX_COLORS + 1).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_events_recorded_in_stage_order() {
        let (extractor, sink) = extractor_with_memory();
        let bytes = png(RgbImage::from_pixel(300, 150, Rgb([40, 80, 120])));

        let colors = extractor.extract(&bytes, 2).unwrap();
        assert_eq!(colors, vec!["#285078", "#285078"]);

        let events = sink.events();
        assert!(matches!(events[0], ExtractionEvent::Decoded { width: 300, height: 150, .. }));
        assert!(matches!(
            events[1],
            ExtractionEvent::Downscaled { from: (300, 150), to: (150, 75) }
        ));
        assert!(matches!(
            events[2],
            ExtractionEvent::Clustered { requested: 2, effective: 1, distinct_colors: 1, .. }
        ));
        assert!(matches!(events[3], ExtractionEvent::Extracted { .. }));
    }

    #[test]
    fn test_zero_max_dimension_clusters_single_pixel() {
        let config = ExtractorConfig {
            max_dimension: 0,
            ..ExtractorConfig::default()
        };
        let extractor = ColorExtractor::new(config, Arc::new(crate::events::NullSink));
        let bytes = png(RgbImage::from_pixel(4, 4, Rgb([90, 60, 30])));

        let colors = extractor.extract(&bytes, 3).unwrap();
        assert_eq!(colors, vec!["#5a3c1e"; 3]);
    }

    #[test]
    fn test_rejection_recorded() {
        let (extractor, sink) = extractor_with_memory();
        assert!(extractor.extract(b"\x00\x01\x02", 3).is_err());
        assert!(matches!(sink.events().as_slice(), [ExtractionEvent::Rejected { .. }]));
    }

    #[test]
    fn test_clusters_report_population() {
        let (extractor, _) = extractor_with_memory();
        let bytes = png(RgbImage::from_fn(4, 4, |x, _| {
            if x == 0 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        }));

        let clusters = extractor.extract_clusters(&bytes, 2).unwrap();
        let mut populations: Vec<usize> = clusters.iter().map(|c| c.population).collect();
        populations.sort_unstable();
        assert_eq!(populations, vec![4, 12]);
    }
}
