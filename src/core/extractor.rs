use crate::domain::model::{ContentKind, ContentVariant, ExtractionFailure, RawCriteria};
use crate::domain::ports::{CriteriaAnalyzer, FetchedBytes, PageFetcher};
use crate::utils::error::{EtlError, Result};
use base64::Engine;

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// Criteria plus the capability that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub criteria: RawCriteria,
    pub via: ContentKind,
}

/// Runs the image-first, text-fallback analysis policy. Each capability is
/// called at most once per announcement.
pub struct CriteriaExtractor<A: CriteriaAnalyzer> {
    analyzer: A,
}

impl<A: CriteriaAnalyzer> CriteriaExtractor<A> {
    pub fn new(analyzer: A) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub async fn analyze<F: PageFetcher>(
        &self,
        fetcher: &F,
        title: &str,
        variant: &ContentVariant,
    ) -> std::result::Result<Extracted, ExtractionFailure> {
        let mut image_error = None;

        if let ContentVariant::Image { url, .. } = variant {
            match self.analyze_image(fetcher, title, url).await {
                Ok(criteria) => {
                    tracing::info!(stage = "analyze", via = "image", "📸 Image analysis succeeded");
                    return Ok(Extracted {
                        criteria,
                        via: ContentKind::Image,
                    });
                }
                Err(e) => {
                    tracing::warn!(stage = "analyze", via = "image", error = %e, "image analysis failed");
                    image_error = Some(e.to_string());
                }
            }
        }

        let text = variant.text().map(str::trim).filter(|t| !t.is_empty());
        let Some(text) = text else {
            return Err(match image_error {
                None => ExtractionFailure::NothingToAnalyze,
                Some(image) => ExtractionFailure::AllAttemptsFailed {
                    image: Some(image),
                    text: None,
                },
            });
        };

        if image_error.is_some() {
            tracing::info!(stage = "analyze", "📝 Falling back to text analysis");
        }

        match self.analyzer.analyze_text(title, text).await {
            Ok(criteria) => {
                tracing::info!(stage = "analyze", via = "text", "📝 Text analysis succeeded");
                Ok(Extracted {
                    criteria,
                    via: ContentKind::Text,
                })
            }
            Err(e) => {
                tracing::warn!(stage = "analyze", via = "text", error = %e, "text analysis failed");
                Err(ExtractionFailure::AllAttemptsFailed {
                    image: image_error,
                    text: Some(e.to_string()),
                })
            }
        }
    }

    async fn analyze_image<F: PageFetcher>(
        &self,
        fetcher: &F,
        title: &str,
        url: &str,
    ) -> Result<RawCriteria> {
        tracing::debug!(image = url, "📥 Downloading image");
        let fetched = fetcher.fetch_bytes(url).await?;
        let data_url = encode_data_url(&fetched)?;
        self.analyzer.analyze_image(title, &data_url).await
    }
}

/// `data:<type>;base64,<payload>` for the downloaded image.
pub fn encode_data_url(fetched: &FetchedBytes) -> Result<String> {
    if fetched.bytes.is_empty() {
        return Err(EtlError::AnalysisError {
            message: "image download was empty".to_string(),
        });
    }

    let media_type = fetched
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    let media_type = match media_type {
        Some(ct) if ct.starts_with("image/") => ct,
        Some(ct) if ct != "application/octet-stream" => {
            return Err(EtlError::AnalysisError {
                message: format!("image URL returned {}", ct),
            })
        }
        _ => DEFAULT_IMAGE_TYPE.to_string(),
    };

    let payload = base64::engine::general_purpose::STANDARD.encode(&fetched.bytes);
    Ok(format!("data:{};base64,{}", media_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedAnalyzer {
        calls: Arc<Mutex<Vec<String>>>,
        image_result: Option<RawCriteria>,
        text_result: Option<RawCriteria>,
    }

    impl ScriptedAnalyzer {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CriteriaAnalyzer for ScriptedAnalyzer {
        async fn analyze_image(&self, _title: &str, image_data_url: &str) -> Result<RawCriteria> {
            self.calls.lock().unwrap().push(format!("image:{}", image_data_url));
            self.image_result.clone().ok_or_else(|| EtlError::AnalysisError {
                message: "malformed JSON".to_string(),
            })
        }

        async fn analyze_text(&self, _title: &str, text: &str) -> Result<RawCriteria> {
            self.calls.lock().unwrap().push(format!("text:{}", text));
            self.text_result.clone().ok_or_else(|| EtlError::AnalysisError {
                message: "malformed JSON".to_string(),
            })
        }
    }

    struct OneImage {
        available: bool,
    }

    impl PageFetcher for OneImage {
        async fn fetch_page(&self, url: &str) -> Result<String> {
            Err(EtlError::HttpStatusError {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes> {
            if self.available {
                Ok(FetchedBytes {
                    bytes: vec![1, 2, 3],
                    content_type: Some("image/png".to_string()),
                })
            } else {
                Err(EtlError::HttpStatusError {
                    url: url.to_string(),
                    status: 500,
                })
            }
        }
    }

    fn criteria(gpa: f64) -> RawCriteria {
        RawCriteria {
            min_gpa: Some(gpa),
            ..Default::default()
        }
    }

    fn image(text: Option<&str>) -> ContentVariant {
        ContentVariant::Image {
            url: "https://web.example.ac.kr/upload/a.png".to_string(),
            text: text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_text_variant_never_invokes_image_capability() {
        let analyzer = ScriptedAnalyzer {
            text_result: Some(criteria(2.5)),
            image_result: Some(criteria(4.0)),
            ..Default::default()
        };
        let extractor = CriteriaExtractor::new(analyzer.clone());
        let variant = ContentVariant::Text {
            body: "평점 2.5 이상".to_string(),
        };

        let extracted = extractor
            .analyze(&OneImage { available: true }, "공고", &variant)
            .await
            .unwrap();

        assert_eq!(extracted.via, ContentKind::Text);
        assert_eq!(extracted.criteria.min_gpa, Some(2.5));
        assert_eq!(analyzer.calls(), vec!["text:평점 2.5 이상".to_string()]);
    }

    #[tokio::test]
    async fn test_image_success_skips_text() {
        let analyzer = ScriptedAnalyzer {
            image_result: Some(criteria(3.0)),
            text_result: Some(criteria(1.0)),
            ..Default::default()
        };
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let extracted = extractor
            .analyze(&OneImage { available: true }, "공고", &image(Some("본문")))
            .await
            .unwrap();

        assert_eq!(extracted.via, ContentKind::Image);
        assert_eq!(
            analyzer.calls(),
            vec!["image:data:image/png;base64,AQID".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_image_falls_back_to_text() {
        let analyzer = ScriptedAnalyzer {
            text_result: Some(criteria(3.3)),
            ..Default::default()
        };
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let extracted = extractor
            .analyze(&OneImage { available: true }, "공고", &image(Some("평점 3.3")))
            .await
            .unwrap();

        assert_eq!(extracted.via, ContentKind::Text);
        let calls = analyzer.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("image:"));
        assert_eq!(calls[1], "text:평점 3.3");
    }

    #[tokio::test]
    async fn test_failed_download_falls_back_to_text() {
        let analyzer = ScriptedAnalyzer {
            image_result: Some(criteria(4.0)),
            text_result: Some(criteria(3.3)),
            ..Default::default()
        };
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let extracted = extractor
            .analyze(&OneImage { available: false }, "공고", &image(Some("평점 3.3")))
            .await
            .unwrap();

        assert_eq!(extracted.via, ContentKind::Text);
        assert_eq!(analyzer.calls(), vec!["text:평점 3.3".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_image_without_text_is_skipped() {
        let analyzer = ScriptedAnalyzer {
            text_result: Some(criteria(3.3)),
            ..Default::default()
        };
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let failure = extractor
            .analyze(&OneImage { available: true }, "공고", &image(None))
            .await
            .unwrap_err();

        assert!(matches!(
            failure,
            ExtractionFailure::AllAttemptsFailed { image: Some(_), text: None }
        ));
        assert_eq!(analyzer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_both_failing_reports_both() {
        let analyzer = ScriptedAnalyzer::default();
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let failure = extractor
            .analyze(&OneImage { available: true }, "공고", &image(Some("본문")))
            .await
            .unwrap_err();

        assert!(matches!(
            failure,
            ExtractionFailure::AllAttemptsFailed { image: Some(_), text: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_empty_variant_has_nothing_to_analyze() {
        let analyzer = ScriptedAnalyzer::default();
        let extractor = CriteriaExtractor::new(analyzer.clone());

        let failure = extractor
            .analyze(&OneImage { available: true }, "공고", &ContentVariant::Empty)
            .await
            .unwrap_err();

        assert_eq!(failure, ExtractionFailure::NothingToAnalyze);
        assert!(analyzer.calls().is_empty());
    }

    #[test]
    fn test_encode_data_url_content_types() {
        let png = FetchedBytes {
            bytes: b"abc".to_vec(),
            content_type: Some("image/PNG; charset=binary".to_string()),
        };
        assert_eq!(encode_data_url(&png).unwrap(), "data:image/png;base64,YWJj");

        let unknown = FetchedBytes {
            bytes: b"abc".to_vec(),
            content_type: None,
        };
        assert_eq!(encode_data_url(&unknown).unwrap(), "data:image/jpeg;base64,YWJj");

        let html = FetchedBytes {
            bytes: b"<html>".to_vec(),
            content_type: Some("text/html".to_string()),
        };
        assert!(encode_data_url(&html).is_err());

        let empty = FetchedBytes {
            bytes: Vec::new(),
            content_type: Some("image/png".to_string()),
        };
        assert!(encode_data_url(&empty).is_err());
    }
}
